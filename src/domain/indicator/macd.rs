//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! All three use the recursive EMA seeded with the first value, so every bar is valid.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    let usable = fast > 0 && slow > 0 && signal_period > 0;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let (line, signal) = if usable {
        let ema_fast = ema_values(&closes, fast);
        let ema_slow = ema_values(&closes, slow);
        let line: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
        let signal = ema_values(&line, signal_period);
        (line, signal)
    } else {
        (vec![0.0; bars.len()], vec![0.0; bars.len()])
    };

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            date: bar.date,
            valid: usable,
            value: IndicatorValue::Macd {
                line: line[i],
                signal: signal[i],
                histogram: line[i] - signal[i],
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
