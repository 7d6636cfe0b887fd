//! Simulated broker used by the backtest driver.
//!
//! Orders fill immediately at the last marked close with no commission.
//! Long-only: a target below zero is rejected.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::error::AllocatorError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::portfolio::Portfolio;
use crate::ports::broker_port::BrokerPort;

const SIZE_EPSILON: f64 = 1e-9;
const CASH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct SimBroker {
    portfolio: Portfolio,
    exchange: String,
    prices: HashMap<String, f64>,
    date: Option<NaiveDate>,
}

impl SimBroker {
    pub fn new(initial_capital: f64, exchange: &str) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            exchange: exchange.to_string(),
            prices: HashMap::new(),
            date: None,
        }
    }

    /// Move the clock to `date` and mark every instrument in `bars` at its
    /// close. Instruments that did not trade keep their previous mark.
    pub fn mark(&mut self, date: NaiveDate, bars: &[OhlcvBar]) {
        self.date = Some(date);
        for bar in bars {
            self.prices.insert(bar.code.clone(), bar.close);
        }
    }

    pub fn price(&self, code: &str) -> Option<f64> {
        self.prices.get(code).copied()
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn into_portfolio(self) -> Portfolio {
        self.portfolio
    }

    /// Append the current marked value to the equity curve.
    pub fn record_equity(&mut self) {
        if let Some(date) = self.date {
            let equity = self.value();
            self.portfolio.record_equity(date, equity);
        }
    }

    fn fill_price(&self, code: &str) -> Result<f64, AllocatorError> {
        match self.prices.get(code) {
            Some(&price) if price.is_finite() && price > 0.0 => Ok(price),
            _ => Err(AllocatorError::OrderRejected {
                code: code.to_string(),
                reason: "no market price".to_string(),
            }),
        }
    }

    fn current_date(&self, code: &str) -> Result<NaiveDate, AllocatorError> {
        self.date.ok_or_else(|| AllocatorError::OrderRejected {
            code: code.to_string(),
            reason: "no session has been marked".to_string(),
        })
    }

    fn fill_buy(&mut self, code: &str, size: f64) -> Result<(), AllocatorError> {
        let price = self.fill_price(code)?;
        let date = self.current_date(code)?;
        let cost = size * price;
        if cost > self.portfolio.cash + CASH_TOLERANCE {
            return Err(AllocatorError::InsufficientCash {
                code: code.to_string(),
                needed: cost,
                available: self.portfolio.cash,
            });
        }

        self.portfolio.acquire(code, &self.exchange, size, price, date);
        debug!(code, size, price, "buy filled");
        Ok(())
    }

    fn fill_sell(&mut self, code: &str, size: f64) -> Result<(), AllocatorError> {
        let price = self.fill_price(code)?;
        let date = self.current_date(code)?;
        let Some(trade) = self.portfolio.dispose(code, size, price, date) else {
            return Ok(());
        };
        debug!(code, quantity = trade.quantity, pnl = trade.pnl, price, "sell filled");
        Ok(())
    }
}

impl BrokerPort for SimBroker {
    fn cash(&self) -> f64 {
        self.portfolio.cash
    }

    fn value(&self) -> f64 {
        self.portfolio.total_equity(&self.prices)
    }

    fn position(&self, code: &str) -> f64 {
        self.portfolio.quantity(code)
    }

    fn buy(&mut self, code: &str, size: f64) -> Result<(), AllocatorError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(AllocatorError::OrderRejected {
                code: code.to_string(),
                reason: format!("invalid buy size {size}"),
            });
        }
        self.fill_buy(code, size)
    }

    fn close(&mut self, code: &str) -> Result<(), AllocatorError> {
        let held = self.position(code);
        if held <= SIZE_EPSILON {
            return Ok(());
        }
        self.fill_sell(code, held)
    }

    fn order_target_size(&mut self, code: &str, size: f64) -> Result<(), AllocatorError> {
        if !size.is_finite() || size < 0.0 {
            return Err(AllocatorError::OrderRejected {
                code: code.to_string(),
                reason: format!("invalid target size {size}"),
            });
        }
        let delta = size - self.position(code);
        if delta > SIZE_EPSILON {
            self.fill_buy(code, delta)
        } else if delta < -SIZE_EPSILON {
            self.fill_sell(code, -delta)
        } else {
            Ok(())
        }
    }
}
