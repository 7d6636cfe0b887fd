//! Cash, open holdings and the realized history of a simulated account.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::position::{ClosedTrade, Position};

/// Holdings smaller than this are treated as flat.
const FLAT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn has_position(&self, code: &str) -> bool {
        self.positions.contains_key(code)
    }

    /// Held quantity, zero when flat.
    pub fn quantity(&self, code: &str) -> f64 {
        self.positions.get(code).map_or(0.0, |p| p.quantity)
    }

    /// Debit `quantity * price` and open or extend the holding. The caller
    /// checks affordability.
    pub fn acquire(&mut self, code: &str, exchange: &str, quantity: f64, price: f64, date: NaiveDate) {
        self.cash -= quantity * price;
        self.positions
            .entry(code.to_string())
            .and_modify(|p| p.add(quantity, price))
            .or_insert_with(|| Position {
                code: code.to_string(),
                exchange: exchange.to_string(),
                quantity,
                entry_price: price,
                entry_date: date,
            });
    }

    /// Sell up to `quantity` at `price`, credit the proceeds and record the
    /// realized trade. Returns `None` when nothing is held.
    pub fn dispose(&mut self, code: &str, quantity: f64, price: f64, date: NaiveDate) -> Option<&ClosedTrade> {
        let pos = self.positions.get_mut(code)?;
        let sold = quantity.min(pos.quantity);
        let trade = ClosedTrade {
            code: pos.code.clone(),
            exchange: pos.exchange.clone(),
            quantity: sold,
            entry_price: pos.entry_price,
            exit_price: price,
            entry_date: pos.entry_date,
            exit_date: date,
            pnl: sold * (price - pos.entry_price),
        };
        pos.quantity -= sold;
        if pos.quantity <= FLAT_EPSILON {
            self.positions.remove(code);
        }

        self.cash += sold * price;
        self.record_trade(trade);
        self.closed_trades.last()
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.closed_trades.push(trade);
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    /// Cash plus holdings marked at `marks`; a holding without a mark is
    /// valued at its entry price.
    pub fn total_equity(&self, marks: &HashMap<String, f64>) -> f64 {
        let holdings: f64 = self
            .positions
            .values()
            .map(|pos| pos.market_value(marks.get(&pos.code).copied().unwrap_or(pos.entry_price)))
            .sum();
        self.cash + holdings
    }
}
