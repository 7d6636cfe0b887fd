//! CLI integration tests for the backtest command orchestration.
//!
//! Tests cover:
//! - Config loading from INI files on disk
//! - Data directory resolution
//! - Full pipeline with MockDataPort and a recording report port
//! - Universe reduction when codes are missing or too short
//! - End-to-end run over CSV files in a temp directory

mod common;

use common::*;
use momentum_allocator::adapters::csv_adapter::CsvAdapter;
use momentum_allocator::adapters::csv_report_adapter::CsvReportAdapter;
use momentum_allocator::adapters::file_config_adapter::FileConfigAdapter;
use momentum_allocator::cli;
use momentum_allocator::domain::backtest::BacktestResult;
use momentum_allocator::domain::config_validation::{
    load_backtest_config, load_codes, load_strategy_config, validate_config,
};
use momentum_allocator::domain::error::AllocatorError;
use momentum_allocator::domain::metrics::Metrics;
use momentum_allocator::ports::data_port::DataPort;
use momentum_allocator::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[strategy]
momentum_period = 10
index_ma_period = 10
stock_ma_period = 10
vol_period = 5
buy_top_percent = 0.34
risk_parity_factor = 0.001
rebalance_weekday = friday
reposition_weekday = friday
reposition_occurrence = 2

[backtest]
start_date = 2024-01-01
end_date = 2024-12-31
initial_capital = 100000.0
risk_free_rate = 0.05
exchange = US
benchmark = idx
codes = AAA, BBB, CCC
data_dir = prices
"#;

/// Report port that remembers what it was asked to write.
#[derive(Default)]
struct RecordingReport {
    written: RefCell<Vec<(String, usize)>>,
    fail: bool,
}

impl ReportPort for RecordingReport {
    fn write(
        &self,
        result: &BacktestResult,
        _metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), AllocatorError> {
        if self.fail {
            return Err(AllocatorError::Report {
                reason: "disk full".to_string(),
            });
        }
        self.written
            .borrow_mut()
            .push((output_path.to_string(), result.portfolio.equity_curve.len()));
        Ok(())
    }
}

const SESSIONS: usize = 80;

fn market() -> MockDataPort {
    let dates = weekdays(date(2024, 1, 1), SESSIONS);
    MockDataPort::new()
        .with_bars("IDX", generate_bars("IDX", &dates, growth(4000.0, 0.002)))
        .with_bars("AAA", generate_bars("AAA", &dates, growth(50.0, 0.001)))
        .with_bars("BBB", generate_bars("BBB", &dates, growth(80.0, 0.006)))
        .with_bars("CCC", generate_bars("CCC", &dates, growth(120.0, 0.003)))
}

fn run_pipeline(
    data: &dyn DataPort,
    report: &dyn ReportPort,
    universe: &[&str],
) -> Result<(BacktestResult, Metrics), AllocatorError> {
    cli::run_backtest_pipeline(
        data,
        report,
        &small_strategy(),
        &sample_config(),
        &codes(universe),
        "out/run",
    )
}

mod config_loading {
    use super::*;

    #[test]
    fn valid_ini_file_loads() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        validate_config(&adapter).unwrap();

        let strategy = load_strategy_config(&adapter).unwrap();
        assert_eq!(strategy.momentum_period, 10);
        assert_eq!(strategy.vol_period, 5);
        assert_eq!(strategy.rebalance_weekday, chrono::Weekday::Fri);

        let bt = load_backtest_config(&adapter).unwrap();
        assert_eq!(bt.start_date, date(2024, 1, 1));
        assert_eq!(bt.end_date, date(2024, 12, 31));
        assert_eq!(bt.benchmark, "IDX");
        assert_eq!(bt.exchange, "US");

        assert_eq!(load_codes(&adapter).unwrap(), codes(&["AAA", "BBB", "CCC"]));
    }

    #[test]
    fn missing_file_fails() {
        let err = cli::load_config(Path::new("/nonexistent/momentum.ini")).unwrap_err();
        assert!(matches!(err, AllocatorError::ConfigParse { .. }));
    }

    #[test]
    fn missing_benchmark_fails_validation() {
        let file = write_temp_ini(&VALID_INI.replace("benchmark = idx\n", ""));
        let adapter = cli::load_config(file.path()).unwrap();
        let err = validate_config(&adapter).unwrap_err();
        match err {
            AllocatorError::ConfigMissing { section, key } => {
                assert_eq!(section, "backtest");
                assert_eq!(key, "benchmark");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_fraction_fails_validation() {
        let file = write_temp_ini(&VALID_INI.replace("buy_top_percent = 0.34", "buy_top_percent = 1.5"));
        let adapter = cli::load_config(file.path()).unwrap();
        assert!(matches!(
            validate_config(&adapter),
            Err(AllocatorError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn duplicate_codes_fail_validation() {
        let file = write_temp_ini(&VALID_INI.replace("AAA, BBB, CCC", "AAA, BBB, aaa"));
        let adapter = cli::load_config(file.path()).unwrap();
        assert!(validate_config(&adapter).is_err());
    }

    #[test]
    fn data_dir_comes_from_config_unless_overridden() {
        let file = write_temp_ini(VALID_INI);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(cli::resolve_data_dir(None, &adapter), PathBuf::from("prices"));
        assert_eq!(
            cli::resolve_data_dir(Some(Path::new("/tmp/bars")), &adapter),
            PathBuf::from("/tmp/bars")
        );
    }
}

mod pipeline {
    use super::*;

    #[test]
    fn full_universe_generates_report() {
        let report = RecordingReport::default();
        let (result, metrics) = run_pipeline(&market(), &report, &["AAA", "BBB", "CCC"]).unwrap();

        assert_eq!(result.sessions.len(), SESSIONS);
        assert_eq!(result.portfolio.equity_curve.len(), SESSIONS);
        assert!(result.rebalances > 0);
        assert!(result.order_count() > 0);
        assert_eq!(result.failed_triggers(), 0);
        assert!(metrics.final_equity > 0.0);

        let written = report.written.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], ("out/run".to_string(), SESSIONS));
    }

    #[test]
    fn equity_starts_at_initial_capital() {
        let report = RecordingReport::default();
        let (result, _) = run_pipeline(&market(), &report, &["AAA", "BBB", "CCC"]).unwrap();
        // Nothing can trade before the indicators warm up.
        assert_eq!(result.portfolio.equity_curve[0].equity, 100_000.0);
        assert_eq!(result.portfolio.equity_curve[0].date, date(2024, 1, 1));
    }

    #[test]
    fn missing_code_is_skipped() {
        let report = RecordingReport::default();
        let (result, _) = run_pipeline(&market(), &report, &["AAA", "ZZZ", "CCC"]).unwrap();
        assert!(result
            .portfolio
            .positions
            .keys()
            .all(|code| code == "AAA" || code == "CCC"));
        assert_eq!(report.written.borrow().len(), 1);
    }

    #[test]
    fn short_history_is_skipped() {
        let dates = weekdays(date(2024, 1, 1), 5);
        let data = market().with_bars("NEW", generate_bars("NEW", &dates, growth(10.0, 0.05)));
        let report = RecordingReport::default();
        let (result, _) = run_pipeline(&data, &report, &["AAA", "NEW"]).unwrap();
        assert!(!result.portfolio.has_position("NEW"));
    }

    #[test]
    fn no_usable_codes_returns_error() {
        let report = RecordingReport::default();
        let err = run_pipeline(&market(), &report, &["XXX", "YYY"]).unwrap_err();
        assert!(matches!(err, AllocatorError::InsufficientData { .. }));
        assert!(report.written.borrow().is_empty());
    }

    #[test]
    fn unreadable_code_is_skipped() {
        let data = market().with_error("BBB", "corrupt file");
        let report = RecordingReport::default();
        assert!(run_pipeline(&data, &report, &["AAA", "BBB"]).is_ok());
    }

    #[test]
    fn missing_benchmark_returns_no_data() {
        let dates = weekdays(date(2024, 1, 1), SESSIONS);
        let data = MockDataPort::new().with_bars("AAA", generate_bars("AAA", &dates, growth(50.0, 0.001)));
        let report = RecordingReport::default();
        let err = run_pipeline(&data, &report, &["AAA"]).unwrap_err();
        match err {
            AllocatorError::NoData { code, .. } => assert_eq!(code, "IDX"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn report_failure_propagates() {
        let report = RecordingReport {
            fail: true,
            ..RecordingReport::default()
        };
        let err = run_pipeline(&market(), &report, &["AAA", "BBB", "CCC"]).unwrap_err();
        assert!(matches!(err, AllocatorError::Report { .. }));
    }
}

mod csv_end_to_end {
    use super::*;
    use std::fs;

    fn write_csv(dir: &Path, code: &str, bars: &[OhlcvBar]) {
        let mut content = String::from("date,open,high,low,close,volume\n");
        for b in bars {
            content.push_str(&format!(
                "{},{},{},{},{},{}\n",
                b.date, b.open, b.high, b.low, b.close, b.volume
            ));
        }
        fs::write(dir.join(format!("{code}_US.csv")), content).unwrap();
    }

    #[test]
    fn backtest_over_csv_files_writes_both_reports() {
        let data_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let dates = weekdays(date(2024, 1, 1), SESSIONS);
        write_csv(data_dir.path(), "IDX", &generate_bars("IDX", &dates, growth(4000.0, 0.002)));
        write_csv(data_dir.path(), "AAA", &generate_bars("AAA", &dates, growth(50.0, 0.001)));
        write_csv(data_dir.path(), "BBB", &generate_bars("BBB", &dates, growth(80.0, 0.006)));
        write_csv(data_dir.path(), "CCC", &generate_bars("CCC", &dates, growth(120.0, 0.003)));

        let data = CsvAdapter::new(data_dir.path().to_path_buf());
        let output = out_dir.path().join("run");
        let output = output.to_string_lossy();
        let (result, _) = cli::run_backtest_pipeline(
            &data,
            &CsvReportAdapter::new(),
            &small_strategy(),
            &sample_config(),
            &codes(&["AAA", "BBB", "CCC"]),
            &output,
        )
        .unwrap();

        let (equity_path, trades_path) = CsvReportAdapter::report_paths(&output);
        let equity = fs::read_to_string(&equity_path).unwrap();
        let mut lines = equity.lines();
        assert_eq!(lines.next(), Some("date,equity"));
        assert_eq!(lines.count(), result.portfolio.equity_curve.len());

        let trades = fs::read_to_string(&trades_path).unwrap();
        assert!(trades.starts_with("code,exchange,quantity,"));
        assert_eq!(
            trades.lines().count(),
            result.portfolio.closed_trades.len() + 1
        );
    }

    #[test]
    fn listed_symbols_match_files() {
        let data_dir = tempfile::tempdir().unwrap();
        let dates = weekdays(date(2024, 1, 1), 3);
        write_csv(data_dir.path(), "BBB", &generate_bars("BBB", &dates, |_| 10.0));
        write_csv(data_dir.path(), "AAA", &generate_bars("AAA", &dates, |_| 10.0));

        let data = CsvAdapter::new(data_dir.path().to_path_buf());
        let mut symbols = data.list_symbols("US").unwrap();
        symbols.sort();
        assert_eq!(symbols, codes(&["AAA", "BBB"]));
        assert_eq!(
            data.get_data_range("AAA", "US").unwrap(),
            Some((dates[0], dates[2], 3))
        );
    }
}
