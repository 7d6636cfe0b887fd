//! Momentum score: annualized log-linear trend weighted by fit quality.
//!
//! y[i] = ln(close[i]), x[i] = i for i in 0..N
//! slope, r² from an ordinary least-squares fit of y on x
//! score = (1 + slope)^252 * r²
//!
//! A steep but noisy trend has a low r² and scores close to zero; a steady
//! trend keeps most of its annualized slope.

use crate::domain::ohlcv::OhlcvBar;

/// Trading sessions per year used to annualize the daily log slope.
pub const SESSIONS_PER_YEAR: i32 = 252;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl TrendFit {
    pub fn annualized_slope(&self) -> f64 {
        (1.0 + self.slope).powi(SESSIONS_PER_YEAR)
    }

    pub fn score(&self) -> f64 {
        self.annualized_slope() * self.r_squared
    }
}

/// Fit ln(price) against the sequence index.
///
/// Returns `None` for fewer than two prices or any price that is not
/// strictly positive and finite. A window with zero variance in ln(price)
/// gets `r_squared = 0`.
pub fn fit_log_trend(prices: &[f64]) -> Option<TrendFit> {
    let n = prices.len();
    if n < 2 || prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return None;
    }

    let ys: Vec<f64> = prices.iter().map(|p| p.ln()).collect();
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy > 0.0 {
        ((sxy * sxy) / (sxx * syy)).min(1.0)
    } else {
        0.0
    };

    Some(TrendFit {
        slope,
        intercept,
        r_squared,
    })
}

pub fn momentum_score(prices: &[f64]) -> Option<f64> {
    fit_log_trend(prices).map(|fit| fit.score())
}

/// Score the trailing `period` closes of a bar history.
pub fn momentum_from_bars(bars: &[OhlcvBar], period: usize) -> Option<f64> {
    if period < 2 || bars.len() < period {
        return None;
    }
    let closes: Vec<f64> = bars[bars.len() - period..]
        .iter()
        .map(|b| b.close)
        .collect();
    momentum_score(&closes)
}
