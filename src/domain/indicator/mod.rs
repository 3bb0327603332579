//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every series carries exactly one point per input bar. Warmup points are
//! marked `valid = false` and never take part in comparisons.

pub mod atr;
pub mod change;
pub mod channel;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volume;

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    DonchianHigh(usize),
    DonchianLow(usize),
    HighestHigh(usize),
    LowestLow(usize),
    VolumeSma(usize),
    DollarVolumeSma(usize),
    Change(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Scalar value at `index`, or `None` during warmup / out of range.
    ///
    /// For MACD this is the MACD line.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        let point = self.values.get(index)?;
        if !point.valid {
            return None;
        }
        match point.value {
            IndicatorValue::Simple(v) => Some(v),
            IndicatorValue::Macd { line, .. } => Some(line),
        }
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.len().checked_sub(1).and_then(|i| self.value_at(i))
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::DonchianHigh(period) => write!(f, "DONCHIAN_HIGH({})", period),
            IndicatorType::DonchianLow(period) => write!(f, "DONCHIAN_LOW({})", period),
            IndicatorType::HighestHigh(period) => write!(f, "HIGHEST_HIGH({})", period),
            IndicatorType::LowestLow(period) => write!(f, "LOWEST_LOW({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::DollarVolumeSma(period) => write!(f, "DOLLAR_VOLUME_SMA({})", period),
            IndicatorType::Change(period) => write!(f, "CHANGE({})", period),
        }
    }
}

/// Compute a single indicator series over `bars`.
pub fn calculate(bars: &[OhlcvBar], indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Sma(n) => sma::calculate_sma(bars, n),
        IndicatorType::Ema(n) => ema::calculate_ema(bars, n),
        IndicatorType::Rsi(n) => rsi::calculate_rsi(bars, n),
        IndicatorType::Atr(n) => atr::calculate_atr(bars, n),
        IndicatorType::Macd { fast, slow, signal } => {
            macd::calculate_macd(bars, fast, slow, signal)
        }
        IndicatorType::DonchianHigh(n) => channel::calculate_donchian_high(bars, n),
        IndicatorType::DonchianLow(n) => channel::calculate_donchian_low(bars, n),
        IndicatorType::HighestHigh(n) => channel::calculate_highest_high(bars, n),
        IndicatorType::LowestLow(n) => channel::calculate_lowest_low(bars, n),
        IndicatorType::VolumeSma(n) => volume::calculate_volume_sma(bars, n),
        IndicatorType::DollarVolumeSma(n) => volume::calculate_dollar_volume_sma(bars, n),
        IndicatorType::Change(n) => change::calculate_change(bars, n),
    }
}

/// Compute every requested indicator once, keyed by type.
pub fn compute_indicators(
    bars: &[OhlcvBar],
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(types.len());
    for &t in types {
        out.entry(t).or_insert_with(|| calculate(bars, t));
    }
    out
}

/// Wrap optional per-bar values into a series. `None` marks warmup.
pub(crate) fn series_from_options(
    bars: &[OhlcvBar],
    indicator_type: IndicatorType,
    values: Vec<Option<f64>>,
) -> IndicatorSeries {
    let values = bars
        .iter()
        .zip(values)
        .map(|(bar, v)| IndicatorPoint {
            date: bar.date,
            valid: v.is_some_and(f64::is_finite),
            value: IndicatorValue::Simple(v.filter(|x| x.is_finite()).unwrap_or(0.0)),
        })
        .collect();
    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// Trailing mean over a window of `period` values. First valid index is `period - 1`.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    pub fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    pub fn make_hl_bars(rows: &[(f64, f64, f64)]) -> Vec<OhlcvBar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| OhlcvBar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high,
                low,
                close,
                volume: 1000,
            })
            .collect()
    }
}
