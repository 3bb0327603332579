//! Remote price download port.

use crate::domain::error::PlaybookError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait QuotePort {
    /// Daily bars for `symbol` between `start` and `end` inclusive, oldest first.
    fn download(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, PlaybookError>;
}
