//! Broker / order-execution port.
//!
//! All calls are synchronous: an order accepted by `buy`, `close` or
//! `order_target_size` must already be reflected in the next `cash`,
//! `value` and `position` reads.

use crate::domain::error::AllocatorError;

pub trait BrokerPort {
    /// Uncommitted cash.
    fn cash(&self) -> f64;

    /// Total equity: cash plus marked positions.
    fn value(&self) -> f64;

    /// Current position size, 0.0 when flat.
    fn position(&self, code: &str) -> f64;

    fn buy(&mut self, code: &str, size: f64) -> Result<(), AllocatorError>;

    /// Flatten the position. Flat instruments are a no-op.
    fn close(&mut self, code: &str) -> Result<(), AllocatorError>;

    /// Move the position to `size`; the broker issues the delta order.
    fn order_target_size(&mut self, code: &str, size: f64) -> Result<(), AllocatorError>;
}
