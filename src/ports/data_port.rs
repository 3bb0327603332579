//! Historical price data port.

use crate::domain::error::PlaybookError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` with `start_date <= date <= end_date`, oldest first.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, PlaybookError>;

    fn list_symbols(&self) -> Result<Vec<String>, PlaybookError>;

    /// First date, last date and bar count, or `None` when no data is stored.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PlaybookError>;

    /// Every stored bar for `symbol`.
    fn fetch_all(&self, symbol: &str) -> Result<Vec<OhlcvBar>, PlaybookError> {
        self.fetch_ohlcv(symbol, NaiveDate::MIN, NaiveDate::MAX)
    }
}
