//! One daily bar of an instrument.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    pub exchange: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// Range of the bar widened by any gap from `prev_close`.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let span = self.high - self.low;
        span.max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }

    /// Why the bar cannot be used for scoring or fills, if anything.
    ///
    /// Prices must be finite and positive, `low` may not exceed `high`,
    /// and open and close must lie inside the range.
    pub fn defect(&self) -> Option<&'static str> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Some("non-positive or non-finite price");
        }
        if self.low > self.high {
            return Some("low above high");
        }
        if !(self.low..=self.high).contains(&self.open) || !(self.low..=self.high).contains(&self.close) {
            return Some("open or close outside the high-low range");
        }
        if self.volume < 0 {
            return Some("negative volume");
        }
        None
    }
}
