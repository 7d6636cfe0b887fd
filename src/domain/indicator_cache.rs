//! Per-instrument indicator memo, refreshed once per session.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::config::StrategyConfig;
use crate::domain::indicator::momentum::momentum_from_bars;
use crate::domain::indicator::{average_true_range, simple_moving_average, IndicatorSnapshot};
use crate::domain::instrument::Instrument;

/// Window lengths for the three per-instrument indicators plus the
/// benchmark moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPeriods {
    pub momentum: usize,
    pub stock_ma: usize,
    pub vol: usize,
    pub index_ma: usize,
}

impl From<&StrategyConfig> for IndicatorPeriods {
    fn from(config: &StrategyConfig) -> Self {
        IndicatorPeriods {
            momentum: config.momentum_period,
            stock_ma: config.stock_ma_period,
            vol: config.vol_period,
            index_ma: config.index_ma_period,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorCache {
    periods: IndicatorPeriods,
    snapshots: HashMap<String, IndicatorSnapshot>,
    benchmark_ma: Option<f64>,
}

impl IndicatorCache {
    pub fn new(periods: IndicatorPeriods) -> Self {
        Self {
            periods,
            snapshots: HashMap::new(),
            benchmark_ma: None,
        }
    }

    /// Compute a snapshot from the instrument's trailing windows, or `None`
    /// if any of the windows is not yet full.
    pub fn compute_snapshot(&self, instrument: &Instrument) -> Option<IndicatorSnapshot> {
        let bars = instrument.bars();
        Some(IndicatorSnapshot {
            momentum_score: momentum_from_bars(bars, self.periods.momentum)?,
            slow_moving_average: simple_moving_average(bars, self.periods.stock_ma)?,
            volatility: average_true_range(bars, self.periods.vol)?,
        })
    }

    /// Recompute every instrument's snapshot and the benchmark MA.
    pub fn refresh<'a, I>(&mut self, instruments: I, benchmark: &Instrument)
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        for instrument in instruments {
            match self.compute_snapshot(instrument) {
                Some(snapshot) => {
                    self.snapshots.insert(instrument.code.clone(), snapshot);
                }
                None => {
                    self.snapshots.remove(&instrument.code);
                    debug!(
                        code = %instrument.code,
                        bars = instrument.bar_count(),
                        "insufficient history for indicators"
                    );
                }
            }
        }
        self.benchmark_ma = simple_moving_average(benchmark.bars(), self.periods.index_ma);
    }

    pub fn get(&self, code: &str) -> Option<&IndicatorSnapshot> {
        self.snapshots.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.snapshots.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn benchmark_ma(&self) -> Option<f64> {
        self.benchmark_ma
    }
}
