//! Instrument bar history and the unified session timeline.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// An instrument identifier plus its ordered, append-only daily bar history.
#[derive(Debug, Clone, Default)]
pub struct Instrument {
    pub code: String,
    pub exchange: String,
    bars: Vec<OhlcvBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl Instrument {
    pub fn new(code: String, exchange: String, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            code,
            exchange,
            bars,
            date_index,
        }
    }

    pub fn empty(code: &str, exchange: &str) -> Self {
        Self::new(code.to_string(), exchange.to_string(), Vec::new())
    }

    /// Append the next session's bar. Returns false (and leaves the history
    /// untouched) when the bar does not come strictly after the last one.
    pub fn push_bar(&mut self, bar: OhlcvBar) -> bool {
        if let Some(last) = self.bars.last() {
            if bar.date <= last.date {
                return false;
            }
        }
        self.date_index.insert(bar.date, self.bars.len());
        self.bars.push(bar);
        true
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn last_bar(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

}

pub fn build_unified_timeline(instruments: &[&Instrument]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = instruments
        .iter()
        .flat_map(|inst| inst.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
