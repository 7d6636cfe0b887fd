//! Strategy and backtest parameters.
//!
//! `StrategyConfig` carries every tunable of the allocation engine;
//! `BacktestConfig` carries the parameters of a simulated run.

use chrono::{NaiveDate, Weekday};

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub momentum_period: usize,
    pub index_ma_period: usize,
    pub stock_ma_period: usize,
    pub vol_period: usize,
    pub buy_top_percent: f64,
    pub risk_parity_factor: f64,
    pub rebalance_weekday: Weekday,
    pub reposition_weekday: Weekday,
    /// Which occurrence of `reposition_weekday` in a month triggers the
    /// interim reposition (1-based).
    pub reposition_occurrence: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            momentum_period: 90,
            index_ma_period: 200,
            stock_ma_period: 100,
            vol_period: 20,
            buy_top_percent: 0.3,
            risk_parity_factor: 0.001,
            rebalance_weekday: Weekday::Fri,
            reposition_weekday: Weekday::Fri,
            reposition_occurrence: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    pub exchange: String,
    pub benchmark: String,
}

/// Parse a weekday from a name ("friday", "Fri") or an ISO number
/// (1 = Monday .. 7 = Sunday).
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let trimmed = value.trim();
    if let Ok(n) = trimmed.parse::<u8>() {
        return match n {
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            6 => Some(Weekday::Sat),
            7 => Some(Weekday::Sun),
            _ => None,
        };
    }
    trimmed.parse::<Weekday>().ok()
}
