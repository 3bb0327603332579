//! Report generation port.

use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::error::PlaybookError;
use crate::domain::metrics::{Metrics, SymbolResult};
use crate::domain::watchlist::ScanResult;
use chrono::NaiveDate;
use std::path::Path;

/// What a watchlist report needs besides the scan itself.
pub struct WatchlistContext<'a> {
    pub date: NaiveDate,
    pub universe: &'a str,
    pub strategies: &'a [String],
    pub scan: &'a ScanResult,
}

pub struct BacktestContext<'a> {
    pub strategy_name: &'a str,
    pub parameters: &'a [(String, String)],
    pub config: &'a BacktestConfig,
    pub result: &'a BacktestResult,
    pub metrics: &'a Metrics,
    pub symbol_results: &'a [SymbolResult],
}

pub trait ReportPort {
    fn write_watchlist(
        &self,
        ctx: &WatchlistContext<'_>,
        output_path: &Path,
    ) -> Result<(), PlaybookError>;

    fn write_backtest(
        &self,
        ctx: &BacktestContext<'_>,
        output_path: &Path,
    ) -> Result<(), PlaybookError>;
}
