//! Per-session eligibility with an explicit warm-up → steady transition.
//!
//! While warming up, only instruments with at least `stock_ma_period` bars
//! are eligible. The first session in which every monitored instrument
//! clears that bar moves the filter to `Steady`, after which the whole
//! monitored universe is eligible for the rest of the run.

use tracing::{debug, info};

use crate::domain::instrument::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityPhase {
    WarmingUp,
    Steady,
}

#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    min_bars: usize,
    phase: EligibilityPhase,
}

impl EligibilityFilter {
    pub fn new(min_bars: usize) -> Self {
        Self {
            min_bars,
            phase: EligibilityPhase::WarmingUp,
        }
    }

    pub fn phase(&self) -> EligibilityPhase {
        self.phase
    }

    /// Advance one session and return the codes eligible in it, in
    /// monitored-universe order.
    pub fn advance<'a>(&mut self, monitored: &'a [Instrument]) -> Vec<&'a str> {
        if self.phase == EligibilityPhase::WarmingUp
            && !monitored.is_empty()
            && monitored.iter().all(|i| i.bar_count() >= self.min_bars)
        {
            info!(instruments = monitored.len(), "all instruments warmed up");
            self.phase = EligibilityPhase::Steady;
        }

        match self.phase {
            EligibilityPhase::Steady => monitored.iter().map(|i| i.code.as_str()).collect(),
            EligibilityPhase::WarmingUp => {
                let eligible: Vec<&str> = monitored
                    .iter()
                    .filter(|i| i.bar_count() >= self.min_bars)
                    .map(|i| i.code.as_str())
                    .collect();
                debug!(
                    eligible = eligible.len(),
                    monitored = monitored.len(),
                    "warming up"
                );
                eligible
            }
        }
    }
}
