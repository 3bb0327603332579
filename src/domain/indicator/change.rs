//! N-bar fractional price change: close[i] / close[i-n] - 1.
//!
//! Warmup: first n bars are invalid. A zero reference close yields an invalid point.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, series_from_options};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_change(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let values = (0..bars.len())
        .map(|i| {
            if period == 0 || i < period {
                return None;
            }
            let base = bars[i - period].close;
            (base != 0.0).then(|| bars[i].close / base - 1.0)
        })
        .collect();
    series_from_options(bars, IndicatorType::Change(period), values)
}
