//! Universe construction: parse the configured code list and load the
//! history of every code that has enough of it.

use crate::domain::error::AllocatorError;
use crate::domain::instrument::Instrument;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl From<UniverseError> for AllocatorError {
    fn from(e: UniverseError) -> Self {
        AllocatorError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "codes".to_string(),
            reason: e.to_string(),
        }
    }
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let code = token.trim().to_uppercase();
        if code.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

/// Instruments admitted to the run, plus the codes left out and why.
#[derive(Debug, Clone)]
pub struct Universe {
    pub exchange: String,
    pub instruments: Vec<Instrument>,
    pub skipped: Vec<SkippedCode>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.code.as_str()).collect()
    }
}

/// Load every code in `[start_date, end_date]`. Codes that fail to load or
/// carry fewer than `min_bars` bars are skipped; if none survive the run
/// cannot proceed.
pub fn load_universe(
    data_port: &dyn DataPort,
    codes: &[String],
    exchange: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_bars: usize,
) -> Result<Universe, AllocatorError> {
    let mut instruments = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let bars = match data_port.fetch_ohlcv(code, exchange, start_date, end_date) {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => {
                warn!(%code, %exchange, "skipping code: no data found");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => {
                warn!(%code, %exchange, "skipping code: {e}");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if bars.len() < min_bars {
            warn!(%code, %exchange, bars = bars.len(), min_bars, "skipping code: insufficient history");
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientBars { bars: bars.len() },
            });
            continue;
        }

        info!(%code, bars = bars.len(), "loaded");
        instruments.push(Instrument::new(code.clone(), exchange.to_string(), bars));
    }

    if instruments.is_empty() {
        return Err(AllocatorError::InsufficientData {
            code: "all".to_string(),
            exchange: exchange.to_string(),
            bars: 0,
            minimum: min_bars,
        });
    }

    if !skipped.is_empty() {
        info!(
            kept = instruments.len(),
            total = codes.len(),
            %exchange,
            "universe reduced"
        );
    }

    Ok(Universe {
        exchange: exchange.to_string(),
        instruments,
        skipped,
    })
}

/// Load the benchmark series. Unlike universe members it cannot be skipped.
pub fn load_benchmark(
    data_port: &dyn DataPort,
    code: &str,
    exchange: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Instrument, AllocatorError> {
    let bars = data_port.fetch_ohlcv(code, exchange, start_date, end_date)?;
    if bars.is_empty() {
        return Err(AllocatorError::NoData {
            code: code.to_string(),
            exchange: exchange.to_string(),
        });
    }
    Ok(Instrument::new(code.to_string(), exchange.to_string(), bars))
}
