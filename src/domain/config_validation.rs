//! Typed configuration loading with validation.
//!
//! Every key is read as text and parsed here so that a malformed value is
//! reported instead of silently replaced by its default.

use std::str::FromStr;

use chrono::{NaiveDate, Weekday};

use crate::domain::config::{parse_weekday, BacktestConfig, StrategyConfig};
use crate::domain::error::AllocatorError;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;

const STRATEGY: &str = "strategy";
const BACKTEST: &str = "backtest";

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> AllocatorError {
    AllocatorError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> AllocatorError {
    AllocatorError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, AllocatorError> {
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| invalid(section, key, format!("cannot parse '{raw}'"))),
    }
}

fn period(config: &dyn ConfigPort, key: &str, default: usize, min: usize) -> Result<usize, AllocatorError> {
    let value = parse_or(config, STRATEGY, key, default)?;
    if value < min {
        return Err(invalid(STRATEGY, key, format!("{key} must be at least {min}")));
    }
    Ok(value)
}

fn weekday(config: &dyn ConfigPort, key: &str, default: Weekday) -> Result<Weekday, AllocatorError> {
    match non_empty(config, STRATEGY, key) {
        None => Ok(default),
        Some(raw) => parse_weekday(&raw)
            .ok_or_else(|| invalid(STRATEGY, key, format!("unknown weekday '{raw}'"))),
    }
}

fn date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, AllocatorError> {
    let raw = non_empty(config, BACKTEST, key).ok_or_else(|| missing(BACKTEST, key))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| invalid(BACKTEST, key, format!("invalid {key} format, expected YYYY-MM-DD")))
}

/// Read `[strategy]`. Absent keys take their defaults.
pub fn load_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, AllocatorError> {
    let defaults = StrategyConfig::default();

    let momentum_period = period(config, "momentum_period", defaults.momentum_period, 2)?;
    let index_ma_period = period(config, "index_ma_period", defaults.index_ma_period, 1)?;
    let stock_ma_period = period(config, "stock_ma_period", defaults.stock_ma_period, 1)?;
    let vol_period = period(config, "vol_period", defaults.vol_period, 1)?;

    let buy_top_percent = parse_or(config, STRATEGY, "buy_top_percent", defaults.buy_top_percent)?;
    if !(buy_top_percent > 0.0 && buy_top_percent <= 1.0) {
        return Err(invalid(
            STRATEGY,
            "buy_top_percent",
            "buy_top_percent must be in (0, 1]",
        ));
    }

    let risk_parity_factor =
        parse_or(config, STRATEGY, "risk_parity_factor", defaults.risk_parity_factor)?;
    if !risk_parity_factor.is_finite() || risk_parity_factor <= 0.0 {
        return Err(invalid(
            STRATEGY,
            "risk_parity_factor",
            "risk_parity_factor must be positive",
        ));
    }

    let reposition_occurrence = parse_or(
        config,
        STRATEGY,
        "reposition_occurrence",
        defaults.reposition_occurrence,
    )?;
    if !(1..=5).contains(&reposition_occurrence) {
        return Err(invalid(
            STRATEGY,
            "reposition_occurrence",
            "reposition_occurrence must be between 1 and 5",
        ));
    }

    Ok(StrategyConfig {
        momentum_period,
        index_ma_period,
        stock_ma_period,
        vol_period,
        buy_top_percent,
        risk_parity_factor,
        rebalance_weekday: weekday(config, "rebalance_weekday", defaults.rebalance_weekday)?,
        reposition_weekday: weekday(config, "reposition_weekday", defaults.reposition_weekday)?,
        reposition_occurrence,
    })
}

/// Read `[backtest]`. Dates, exchange and benchmark are required.
pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, AllocatorError> {
    let start_date = date(config, "start_date")?;
    let end_date = date(config, "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            BACKTEST,
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let initial_capital = parse_or(config, BACKTEST, "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(invalid(
            BACKTEST,
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let risk_free_rate = parse_or(config, BACKTEST, "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            BACKTEST,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    let exchange = non_empty(config, BACKTEST, "exchange").ok_or_else(|| missing(BACKTEST, "exchange"))?;
    let benchmark = non_empty(config, BACKTEST, "benchmark")
        .ok_or_else(|| missing(BACKTEST, "benchmark"))?
        .to_uppercase();

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital,
        risk_free_rate,
        exchange,
        benchmark,
    })
}

/// The monitored code list from `[backtest] codes`.
pub fn load_codes(config: &dyn ConfigPort) -> Result<Vec<String>, AllocatorError> {
    let raw = non_empty(config, BACKTEST, "codes").ok_or_else(|| missing(BACKTEST, "codes"))?;
    Ok(parse_codes(&raw)?)
}

/// Check every section a backtest needs without touching any data.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), AllocatorError> {
    load_strategy_config(config)?;
    load_backtest_config(config)?;
    load_codes(config)?;
    Ok(())
}
