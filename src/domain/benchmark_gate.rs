//! Benchmark trend gate.

/// Whether new exposure may be added this trigger.
///
/// Open when the benchmark's session open is at or above its long moving
/// average. Closed while the moving average is not yet available.
pub fn allows_new_exposure(benchmark_open: f64, benchmark_ma: Option<f64>) -> bool {
    match benchmark_ma {
        Some(ma) if ma.is_finite() && benchmark_open.is_finite() => benchmark_open >= ma,
        _ => false,
    }
}
