//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AllocatorError;
use crate::domain::metrics::Metrics;

pub trait ReportPort {
    /// Write the outcome of a run. `output_path` names the report; adapters
    /// may derive several files from it.
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), AllocatorError>;
}
