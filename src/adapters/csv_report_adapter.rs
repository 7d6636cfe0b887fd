//! CSV report adapter.
//!
//! For an output path `out/run` (or `out/run.csv`) writes
//! `out/run_equity.csv` and `out/run_trades.csv`.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AllocatorError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Paths of the equity and trade files derived from `output_path`.
    pub fn report_paths(output_path: &str) -> (PathBuf, PathBuf) {
        let path = Path::new(output_path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        (
            dir.join(format!("{stem}_equity.csv")),
            dir.join(format!("{stem}_trades.csv")),
        )
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> AllocatorError {
    AllocatorError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_equity(path: &Path, result: &BacktestResult) -> Result<(), AllocatorError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
    wtr.write_record(["date", "equity"])
        .map_err(|e| report_error(path, e))?;
    for point in &result.portfolio.equity_curve {
        wtr.write_record([point.date.to_string(), format!("{:.2}", point.equity)])
            .map_err(|e| report_error(path, e))?;
    }
    wtr.flush().map_err(|e| report_error(path, e))
}

fn write_trades(path: &Path, result: &BacktestResult) -> Result<(), AllocatorError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
    wtr.write_record([
        "code",
        "exchange",
        "quantity",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "pnl",
    ])
    .map_err(|e| report_error(path, e))?;
    for trade in &result.portfolio.closed_trades {
        wtr.write_record([
            trade.code.clone(),
            trade.exchange.clone(),
            format!("{:.4}", trade.quantity),
            trade.entry_date.to_string(),
            format!("{:.4}", trade.entry_price),
            trade.exit_date.to_string(),
            format!("{:.4}", trade.exit_price),
            format!("{:.2}", trade.pnl),
        ])
        .map_err(|e| report_error(path, e))?;
    }
    wtr.flush().map_err(|e| report_error(path, e))
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), AllocatorError> {
        let (equity_path, trades_path) = Self::report_paths(output_path);
        write_equity(&equity_path, result)?;
        write_trades(&trades_path, result)?;
        tracing::info!(
            equity = %equity_path.display(),
            trades = %trades_path.display(),
            total_return = metrics.total_return,
            "report written"
        );
        Ok(())
    }
}
