//! Trailing-window indicators used by the allocation engine.
//!
//! - [`momentum`]: log-linear regression trend score
//! - [`simple_moving_average`]: mean close over the trailing window
//! - [`average_true_range`]: mean true range over the trailing window
//!
//! Every function here looks only at the trailing window it is handed and
//! returns `None` when that window is too short to compute a value.

pub mod momentum;

use crate::domain::ohlcv::OhlcvBar;

/// Latest indicator values for one instrument as of the current session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub momentum_score: f64,
    pub slow_moving_average: f64,
    pub volatility: f64,
}

/// SMA(n) = sum(close[i-n+1..=i]) / n over the last `period` bars.
pub fn simple_moving_average(bars: &[OhlcvBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    Some(window.iter().map(|b| b.close).sum::<f64>() / period as f64)
}

/// Mean of the last `period` true ranges. Each true range needs the
/// previous close, so `period + 1` bars are required.
pub fn average_true_range(bars: &[OhlcvBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let window = &bars[bars.len() - (period + 1)..];
    let sum_tr: f64 = window
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .sum();
    Some(sum_tr / period as f64)
}

#[cfg(test)]
pub(crate) fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
    use chrono::NaiveDate;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            code: "TEST".into(),
            exchange: "TEST".into(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        })
        .collect()
}
