//! Market data feed port trait.

use crate::domain::error::AllocatorError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `code` within `[start_date, end_date]`, oldest first.
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, AllocatorError>;

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, AllocatorError>;

    /// First date, last date and bar count of everything stored for `code`.
    fn get_data_range(
        &self,
        code: &str,
        exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AllocatorError>;
}
