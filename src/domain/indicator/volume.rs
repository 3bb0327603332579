//! Volume averages: share volume and dollar volume (close * volume).

use crate::domain::indicator::{IndicatorSeries, IndicatorType, rolling_mean, series_from_options};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    series_from_options(
        bars,
        IndicatorType::VolumeSma(period),
        rolling_mean(&volumes, period),
    )
}

pub fn calculate_dollar_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let dollars: Vec<f64> = bars.iter().map(OhlcvBar::dollar_volume).collect();
    series_from_options(
        bars,
        IndicatorType::DollarVolumeSma(period),
        rolling_mean(&dollars, period),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn volume_sma() {
        let mut bars = make_bars(&[10.0, 10.0, 10.0]);
        bars[0].volume = 100;
        bars[1].volume = 200;
        bars[2].volume = 600;
        let series = calculate_volume_sma(&bars, 2);
        assert_eq!(series.value_at(0), None);
        assert_eq!(series.value_at(1), Some(150.0));
        assert_eq!(series.value_at(2), Some(400.0));
    }

    #[test]
    fn dollar_volume_sma() {
        let mut bars = make_bars(&[10.0, 20.0]);
        bars[0].volume = 100;
        bars[1].volume = 100;
        let series = calculate_dollar_volume_sma(&bars, 2);
        assert_eq!(series.value_at(1), Some(1500.0));
    }
}
