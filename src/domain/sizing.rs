//! Inverse-volatility position sizing.
//!
//! target_size = equity * risk_parity_factor / volatility
//!
//! Every selected position then carries a comparable dollar amount of
//! daily range regardless of how volatile the instrument is.

/// Volatility estimates at or below this are treated as degenerate.
pub const MIN_VOLATILITY: f64 = 1e-12;

/// Returns `None` when the volatility is degenerate (zero, negative, tiny or
/// non-finite) or when the resulting size is not finite.
pub fn target_size(equity: f64, risk_parity_factor: f64, volatility: f64) -> Option<f64> {
    if !volatility.is_finite() || volatility <= MIN_VOLATILITY {
        return None;
    }
    let size = equity * risk_parity_factor / volatility;
    size.is_finite().then_some(size)
}
