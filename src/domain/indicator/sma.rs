//! Simple Moving Average indicator.
//!
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, rolling_mean, series_from_options};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    series_from_options(bars, IndicatorType::Sma(period), rolling_mean(&closes, period))
}
