//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config::{BacktestConfig, StrategyConfig};
use crate::domain::config_validation::{
    load_backtest_config, load_codes, load_strategy_config, validate_config,
};
use crate::domain::error::AllocatorError;
use crate::domain::metrics::{CodeResult, Metrics};
use crate::domain::universe::{load_benchmark, load_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUTPUT: &str = "report";

#[derive(Parser, Debug)]
#[command(
    name = "momentum-allocator",
    about = "Momentum portfolio allocation backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Report path; `<stem>_equity.csv` and `<stem>_trades.csv` are written
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory holding `<code>_<exchange>.csv` files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the stored data range of the universe or of one code
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            data_dir,
        } => run_backtest_command(&config, output.as_deref(), data_dir.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            code,
            data_dir,
        } => run_info(&config, code.as_deref(), data_dir.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AllocatorError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// `--data-dir` wins over `[backtest] data_dir`, which wins over `data`.
pub fn resolve_data_dir(override_dir: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    config
        .get_string("backtest", "data_dir")
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn run_backtest_command(
    config_path: &Path,
    output: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<(), AllocatorError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;

    let strategy = load_strategy_config(&adapter)?;
    let bt_config = load_backtest_config(&adapter)?;
    let codes = load_codes(&adapter)?;
    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));
    let output = output
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let (result, metrics) = run_backtest_pipeline(
        &data_port,
        &CsvReportAdapter::new(),
        &strategy,
        &bt_config,
        &codes,
        &output,
    )?;
    print_summary(&result, &metrics);
    let (equity_path, trades_path) = CsvReportAdapter::report_paths(&output);
    eprintln!("\nReport written to: {}", equity_path.display());
    eprintln!("                   {}", trades_path.display());
    Ok(())
}

/// Load the universe and benchmark, replay them through the engine, then
/// write the report.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategy: &StrategyConfig,
    bt_config: &BacktestConfig,
    codes: &[String],
    output_path: &str,
) -> Result<(BacktestResult, Metrics), AllocatorError> {
    eprintln!("Validating {} codes on {}...", codes.len(), bt_config.exchange);
    let universe = load_universe(
        data_port,
        codes,
        &bt_config.exchange,
        bt_config.start_date,
        bt_config.end_date,
        strategy.momentum_period,
    )?;
    if !universe.skipped.is_empty() {
        eprintln!(
            "Backtesting {} of {} codes ({} skipped)",
            universe.count(),
            codes.len(),
            universe.skipped.len()
        );
    }

    let benchmark = load_benchmark(
        data_port,
        &bt_config.benchmark,
        &bt_config.exchange,
        bt_config.start_date,
        bt_config.end_date,
    )?;

    eprintln!(
        "Running backtest: {} codes against {}, {} to {}",
        universe.count(),
        benchmark.code,
        bt_config.start_date,
        bt_config.end_date,
    );
    eprintln!("  Processing: {} sessions", benchmark.bar_count());

    let result = run_backtest(&benchmark, &universe.instruments, strategy, bt_config)?;
    let metrics = Metrics::compute(&result.portfolio, bt_config.risk_free_rate);
    report_port.write(&result, &metrics, output_path)?;
    Ok((result, metrics))
}

fn print_summary(result: &BacktestResult, metrics: &Metrics) {
    eprintln!("\n=== Results ===");
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Rebalances:       {}", result.rebalances);
    eprintln!("Repositions:      {}", result.repositions);
    eprintln!("Orders:           {}", result.order_count());
    if result.failed_triggers() > 0 {
        eprintln!("Failed triggers:  {}", result.failed_triggers());
    }

    let code_results = CodeResult::compute_per_code(&result.portfolio.closed_trades);
    if !code_results.is_empty() {
        eprintln!("\n=== Per-Code Summary ===");
        for cr in &code_results {
            let pnl_sign = if cr.total_pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, {}{:.0}",
                cr.code,
                cr.total_trades,
                cr.win_rate * 100.0,
                pnl_sign,
                cr.total_pnl,
            );
        }
    }
}

fn run_validate(config_path: &Path) -> Result<(), AllocatorError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;

    let strategy = load_strategy_config(&adapter)?;
    let bt_config = load_backtest_config(&adapter)?;
    let codes = load_codes(&adapter)?;

    eprintln!("\nStrategy:");
    eprintln!("  momentum_period:       {}", strategy.momentum_period);
    eprintln!("  index_ma_period:       {}", strategy.index_ma_period);
    eprintln!("  stock_ma_period:       {}", strategy.stock_ma_period);
    eprintln!("  vol_period:            {}", strategy.vol_period);
    eprintln!("  buy_top_percent:       {}", strategy.buy_top_percent);
    eprintln!("  risk_parity_factor:    {}", strategy.risk_parity_factor);
    eprintln!("  rebalance_weekday:     {}", strategy.rebalance_weekday);
    eprintln!(
        "  reposition:            {} #{} of each month",
        strategy.reposition_weekday, strategy.reposition_occurrence
    );
    eprintln!("\nBacktest:");
    eprintln!("  period:    {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  capital:   {:.2}", bt_config.initial_capital);
    eprintln!("  benchmark: {}.{}", bt_config.benchmark, bt_config.exchange);
    eprintln!("  codes:     {}", codes.join(", "));
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(
    config_path: &Path,
    code: Option<&str>,
    data_dir: Option<&Path>,
) -> Result<(), AllocatorError> {
    let adapter = load_config(config_path)?;
    let exchange = adapter
        .get_string("backtest", "exchange")
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AllocatorError::ConfigMissing {
            section: "backtest".to_string(),
            key: "exchange".to_string(),
        })?;
    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));

    let codes = match code {
        Some(c) => vec![c.to_uppercase()],
        None => {
            let mut codes = data_port.list_symbols(&exchange)?;
            if codes.is_empty() {
                eprintln!("No symbols found for exchange {}", exchange);
            }
            codes.sort();
            codes
        }
    };

    for c in &codes {
        match data_port.get_data_range(c, &exchange)? {
            Some((first, last, bars)) => {
                println!("{}.{}: {} bars, {} to {}", c, exchange, bars, first, last)
            }
            None => eprintln!("{}.{}: no data found", c, exchange),
        }
    }
    Ok(())
}
