//! RSI (Relative Strength Index) indicator.
//!
//! Average gain/loss are simple rolling means over the last n close-to-close
//! changes (Cutler's variant, no Wilder smoothing).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorSeries, IndicatorType, rolling_mean, series_from_options};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return series_from_options(bars, IndicatorType::Rsi(period), vec![None; bars.len()]);
    }

    let mut gains = Vec::with_capacity(bars.len() - 1);
    let mut losses = Vec::with_capacity(bars.len() - 1);
    for w in bars.windows(2) {
        let change = w[1].close - w[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    let mut values = Vec::with_capacity(bars.len());
    values.push(None);
    for (g, l) in avg_gain.into_iter().zip(avg_loss) {
        values.push(match (g, l) {
            (Some(g), Some(l)) => Some(if l == 0.0 {
                100.0
            } else {
                100.0 - (100.0 / (1.0 + g / l))
            }),
            _ => None,
        });
    }

    series_from_options(bars, IndicatorType::Rsi(period), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use proptest::prelude::*;

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert_eq!(series.values.len(), 0);
    }

    #[test]
    fn rsi_single_bar() {
        let bars = make_bars(&[100.0]);
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let bars = make_bars(&prices);
        let series = calculate_rsi(&bars, 14);

        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        assert_eq!(series.value_at(14), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        assert!(series.value_at(14).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_known_calculation() {
        // changes: +2, -1, +2 → avg gain 4/3, avg loss 1/3 → RS 4 → RSI 80
        let series = calculate_rsi(&make_bars(&[10.0, 12.0, 11.0, 13.0]), 3);
        assert!((series.value_at(3).unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_bars(&[100.0, 101.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    proptest! {
        #[test]
        fn rsi_in_range(prices in prop::collection::vec(1.0f64..500.0, 2..80), period in 1usize..20) {
            let series = calculate_rsi(&make_bars(&prices), period);
            for i in 0..prices.len() {
                if let Some(v) = series.value_at(i) {
                    prop_assert!((0.0..=100.0).contains(&v));
                }
            }
        }
    }
}
