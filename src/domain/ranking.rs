//! Ranking and top-fraction selection.
//!
//! A [`RankedList`] is built fresh on every rebalance and never mutated
//! afterwards. Entries are ordered ascending by momentum score, so index 0
//! is the weakest instrument and the strongest sits at the end. The "top"
//! fraction is always the tail of the list.

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::indicator_cache::IndicatorCache;

/// Absorbs representation error in `n * p` (e.g. 100 * 0.29).
const COUNT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub code: String,
    pub snapshot: IndicatorSnapshot,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedList {
    entries: Vec<RankedEntry>,
}

/// floor(n * fraction), clamped to n.
pub fn candidate_count(n: usize, fraction: f64) -> usize {
    if n == 0 || fraction.is_nan() || fraction <= 0.0 {
        return 0;
    }
    let count = (n as f64 * fraction + COUNT_EPSILON).floor() as usize;
    count.min(n)
}

/// Rank the eligible codes that have a cached snapshot.
///
/// Ties on score are broken by code so the order is deterministic.
pub fn rank(eligible: &[&str], cache: &IndicatorCache) -> RankedList {
    let entries: Vec<RankedEntry> = eligible
        .iter()
        .filter_map(|code| {
            cache.get(code).map(|snapshot| RankedEntry {
                code: (*code).to_string(),
                snapshot: *snapshot,
            })
        })
        .collect();

    RankedList::from_entries(entries)
}

impl RankedList {
    pub fn from_entries(mut entries: Vec<RankedEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.snapshot
                .momentum_score
                .total_cmp(&b.snapshot.momentum_score)
                .then_with(|| a.code.cmp(&b.code))
        });
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn codes(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.code.as_str()).collect()
    }

    /// Index of the first entry in the top fraction.
    pub fn top_start(&self, fraction: f64) -> usize {
        self.len() - candidate_count(self.len(), fraction)
    }

    /// The strongest `floor(n * fraction)` entries, still in ascending order.
    pub fn top(&self, fraction: f64) -> &[RankedEntry] {
        &self.entries[self.top_start(fraction)..]
    }

    pub fn is_top(&self, index: usize, fraction: f64) -> bool {
        index < self.len() && index >= self.top_start(fraction)
    }
}
