//! Holdings of the simulated account and the trades that closed them.

use chrono::NaiveDate;

/// Long holding in one instrument. Sizes are fractional.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub code: String,
    pub exchange: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Add to the position, moving the entry price to the size-weighted
    /// average of the old and new fills. The entry date stays the first one.
    pub fn add(&mut self, quantity: f64, price: f64) {
        let total = self.quantity + quantity;
        if total > 0.0 {
            self.entry_price = (self.quantity * self.entry_price + quantity * price) / total;
        }
        self.quantity = total;
    }
}

/// A realized sale, whole or partial.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub code: String,
    pub exchange: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
}
