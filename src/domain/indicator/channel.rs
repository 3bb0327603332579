//! Price channels: rolling highest high / lowest low.
//!
//! Donchian variants look at the n bars *before* the current one, so a close
//! above the channel is a genuine breakout (first valid index n). The
//! highest/lowest variants include the current bar (first valid index n-1).

use crate::domain::indicator::{IndicatorSeries, IndicatorType, series_from_options};
use crate::domain::ohlcv::OhlcvBar;

fn rolling_extreme(
    values: &[f64],
    period: usize,
    exclude_current: bool,
    pick: fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    let offset = usize::from(exclude_current);
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period + offset {
                return None;
            }
            let end = i + 1 - offset;
            values[end - period..end].iter().copied().reduce(pick)
        })
        .collect()
}

pub fn calculate_donchian_high(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    series_from_options(
        bars,
        IndicatorType::DonchianHigh(period),
        rolling_extreme(&highs, period, true, f64::max),
    )
}

pub fn calculate_donchian_low(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    series_from_options(
        bars,
        IndicatorType::DonchianLow(period),
        rolling_extreme(&lows, period, true, f64::min),
    )
}

pub fn calculate_highest_high(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    series_from_options(
        bars,
        IndicatorType::HighestHigh(period),
        rolling_extreme(&highs, period, false, f64::max),
    )
}

pub fn calculate_lowest_low(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    series_from_options(
        bars,
        IndicatorType::LowestLow(period),
        rolling_extreme(&lows, period, false, f64::min),
    )
}
