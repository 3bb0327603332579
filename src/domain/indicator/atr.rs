//! Average True Range.
//!
//! TR[0] = high - low (no previous close), TR[i] = true_range(close[i-1]).
//! ATR is the simple rolling mean of TR. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, rolling_mean, series_from_options};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    series_from_options(bars, IndicatorType::Atr(period), rolling_mean(&tr_values, period))
}
