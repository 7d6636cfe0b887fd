#![allow(dead_code)]

use chrono::{Datelike, Days, NaiveDate, Weekday};
use momentum_allocator::domain::config::{BacktestConfig, StrategyConfig};
use momentum_allocator::domain::engine::{Engine, MarketSession, SessionReport};
use momentum_allocator::domain::error::AllocatorError;
pub use momentum_allocator::domain::ohlcv::OhlcvBar;
use momentum_allocator::ports::broker_port::BrokerPort;
use momentum_allocator::ports::data_port::DataPort;
use std::collections::{HashMap, HashSet};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        _exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, AllocatorError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(AllocatorError::DataFeed {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self, _exchange: &str) -> Result<Vec<String>, AllocatorError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    fn get_data_range(
        &self,
        code: &str,
        _exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AllocatorError> {
        Ok(self.data.get(code).and_then(|bars| {
            let first = bars.first()?.date;
            let last = bars.last()?.date;
            Some((first, last, bars.len()))
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Buy(String, f64),
    Close(String),
    Target(String, f64),
}

impl BrokerCall {
    pub fn code(&self) -> &str {
        match self {
            BrokerCall::Buy(c, _) | BrokerCall::Close(c) | BrokerCall::Target(c, _) => c,
        }
    }
}

/// Broker double that fills everything at `unit_cost` per share and records
/// every call. Equity stays at `value` unless a test changes it.
pub struct RecordingBroker {
    pub cash: f64,
    pub value: f64,
    pub unit_cost: f64,
    pub positions: HashMap<String, f64>,
    pub calls: Vec<BrokerCall>,
    pub reject: HashSet<String>,
}

impl RecordingBroker {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            value: cash,
            unit_cost: 0.0,
            positions: HashMap::new(),
            calls: Vec::new(),
            reject: HashSet::new(),
        }
    }

    pub fn holding(mut self, code: &str, size: f64) -> Self {
        self.positions.insert(code.to_string(), size);
        self
    }

    pub fn rejecting(mut self, code: &str) -> Self {
        self.reject.insert(code.to_string());
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: f64) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    fn check(&self, code: &str) -> Result<(), AllocatorError> {
        if self.reject.contains(code) {
            return Err(AllocatorError::OrderRejected {
                code: code.to_string(),
                reason: "rejected by test broker".to_string(),
            });
        }
        Ok(())
    }
}

impl BrokerPort for RecordingBroker {
    fn cash(&self) -> f64 {
        self.cash
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn position(&self, code: &str) -> f64 {
        self.positions.get(code).copied().unwrap_or(0.0)
    }

    fn buy(&mut self, code: &str, size: f64) -> Result<(), AllocatorError> {
        self.check(code)?;
        *self.positions.entry(code.to_string()).or_insert(0.0) += size;
        self.cash -= size * self.unit_cost;
        self.calls.push(BrokerCall::Buy(code.to_string(), size));
        Ok(())
    }

    fn close(&mut self, code: &str) -> Result<(), AllocatorError> {
        self.check(code)?;
        let held = self.positions.remove(code).unwrap_or(0.0);
        self.cash += held * self.unit_cost;
        self.calls.push(BrokerCall::Close(code.to_string()));
        Ok(())
    }

    fn order_target_size(&mut self, code: &str, size: f64) -> Result<(), AllocatorError> {
        self.check(code)?;
        let held = self.position(code);
        self.cash -= (size - held) * self.unit_cost;
        self.positions.insert(code.to_string(), size);
        self.calls.push(BrokerCall::Target(code.to_string(), size));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday to Friday dates starting at `start`.
pub fn weekdays(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let mut d = start;
    while out.len() < count {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d = d + Days::new(1);
    }
    out
}

/// Bar with open at the close and a 1% range either side.
pub fn make_bar(code: &str, date: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        exchange: "US".to_string(),
        date,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1000,
    }
}

pub fn generate_bars(code: &str, dates: &[NaiveDate], price: impl Fn(usize) -> f64) -> Vec<OhlcvBar> {
    dates
        .iter()
        .enumerate()
        .map(|(i, &d)| make_bar(code, d, price(i)))
        .collect()
}

/// Exponential path growing by `rate` per session.
pub fn growth(start: f64, rate: f64) -> impl Fn(usize) -> f64 {
    move |i| start * (1.0 + rate).powi(i as i32)
}

pub struct Series {
    pub code: &'static str,
    pub price: Box<dyn Fn(usize) -> f64>,
}

pub fn series(code: &'static str, price: impl Fn(usize) -> f64 + 'static) -> Series {
    Series {
        code,
        price: Box::new(price),
    }
}

pub fn build_sessions(dates: &[NaiveDate], benchmark: &Series, instruments: &[Series]) -> Vec<MarketSession> {
    dates
        .iter()
        .enumerate()
        .map(|(i, &d)| MarketSession {
            date: d,
            benchmark: make_bar(benchmark.code, d, (benchmark.price)(i)),
            bars: instruments
                .iter()
                .map(|s| make_bar(s.code, d, (s.price)(i)))
                .collect(),
        })
        .collect()
}

pub fn run_sessions(
    engine: &mut Engine,
    broker: &mut dyn BrokerPort,
    sessions: &[MarketSession],
) -> Vec<SessionReport> {
    sessions
        .iter()
        .map(|s| engine.on_session_advance(s, broker).unwrap())
        .collect()
}

/// Short periods so that a couple of weeks of sessions reach steady state.
pub fn small_strategy() -> StrategyConfig {
    StrategyConfig {
        momentum_period: 10,
        index_ma_period: 10,
        stock_ma_period: 10,
        vol_period: 5,
        buy_top_percent: 0.34,
        ..StrategyConfig::default()
    }
}

pub fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        initial_capital: 100_000.0,
        risk_free_rate: 0.0,
        exchange: "US".to_string(),
        benchmark: "IDX".to_string(),
    }
}
