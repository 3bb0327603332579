//! Playbooks: coded trading strategies sharing a common base.
//!
//! Each playbook declares its metadata and the indicators it needs as spec
//! strings (`"SMA(200)"`, `"EMA(10) EMA(30)"`). The default
//! [`Playbook::calculate_indicators`] parses those strings and computes the
//! series; the playbook then marks signal events bar by bar in
//! [`Playbook::detect`].

pub mod donchian;
pub mod htf;
pub mod ma101;
pub mod swing;

use crate::domain::error::PlaybookError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, compute_indicators};
use crate::domain::indicator_spec::parse_all;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::Position;
use crate::domain::signal::{Signal, SignalFrame};
use crate::domain::sizing::{RiskConfig, calculate_position_size};
use crate::ports::config_port::ConfigPort;
use std::collections::HashMap;

pub use donchian::{DonchianBreakout, DonchianParams};
pub use htf::{HtfParams, QullamaggieHtf};
pub use ma101::{Ma101, Ma101Params};
pub use swing::{EntryMode, SwingParams, SwingTrading};

/// Descriptive metadata shown by `strategies` and in reports.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybookMeta {
    pub name: String,
    pub timeframe: String,
    pub asset_class: String,
    pub style: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybookDefinition {
    pub meta: PlaybookMeta,
    pub required_indicators: Vec<String>,
    /// Fraction of equity risked per trade.
    pub risk_pct: f64,
    pub parameters_to_optimize: Vec<String>,
}

pub trait Playbook {
    fn id(&self) -> &'static str;

    fn definition(&self) -> &PlaybookDefinition;

    /// Current parameter values as `(key, value)` pairs, in config-key form.
    fn parameters(&self) -> Vec<(String, String)>;

    /// Mark signal events on `frame`, whose indicators are already computed.
    fn detect(&self, frame: &mut SignalFrame<'_>);

    /// Exit reason for `position` at bar `index`, if any rule fires.
    fn check_exit(&self, frame: &SignalFrame<'_>, index: usize, position: &Position)
    -> Option<String>;

    /// Attach indicator context to a current signal.
    fn enrich(&self, _frame: &SignalFrame<'_>, _index: usize, _signal: &mut Signal) {}

    fn name(&self) -> &str {
        &self.definition().meta.name
    }

    fn indicator_types(&self) -> Result<Vec<IndicatorType>, PlaybookError> {
        Ok(parse_all(&self.definition().required_indicators)?)
    }

    fn calculate_indicators(
        &self,
        bars: &[OhlcvBar],
    ) -> Result<HashMap<IndicatorType, IndicatorSeries>, PlaybookError> {
        Ok(compute_indicators(bars, &self.indicator_types()?))
    }

    fn generate_signals<'a>(&self, bars: &'a [OhlcvBar]) -> Result<SignalFrame<'a>, PlaybookError> {
        let indicators = self.calculate_indicators(bars)?;
        let mut frame = SignalFrame::new(bars, indicators);
        self.detect(&mut frame);
        Ok(frame)
    }

    /// The signal on the most recent bar, if one fired there.
    fn check_current_signal(&self, bars: &[OhlcvBar]) -> Result<Option<Signal>, PlaybookError> {
        let frame = self.generate_signals(bars)?;
        let Some(index) = frame.len().checked_sub(1) else {
            return Ok(None);
        };
        let Some(event) = frame.event(index) else {
            return Ok(None);
        };
        let mut signal = Signal::from_event(&frame.bars[index], self.id(), self.name(), event);
        self.enrich(&frame, index, &mut signal);
        Ok(Some(signal))
    }

    fn position_size(&self, entry: f64, stop: f64, equity: f64, risk: &RiskConfig) -> i64 {
        calculate_position_size(entry, stop, equity, self.definition().risk_pct, risk)
    }
}

/// Fast series crossed above slow between `index - 1` and `index`.
pub(crate) fn crossed_above(
    frame: &SignalFrame<'_>,
    fast: IndicatorType,
    slow: IndicatorType,
    index: usize,
) -> bool {
    if index == 0 {
        return false;
    }
    match (
        frame.value(fast, index - 1),
        frame.value(slow, index - 1),
        frame.value(fast, index),
        frame.value(slow, index),
    ) {
        (Some(pf), Some(ps), Some(f), Some(s)) => pf <= ps && f > s,
        _ => false,
    }
}

pub(crate) fn crossed_below(
    frame: &SignalFrame<'_>,
    fast: IndicatorType,
    slow: IndicatorType,
    index: usize,
) -> bool {
    if index == 0 {
        return false;
    }
    match (
        frame.value(fast, index - 1),
        frame.value(slow, index - 1),
        frame.value(fast, index),
        frame.value(slow, index),
    ) {
        (Some(pf), Some(ps), Some(f), Some(s)) => pf >= ps && f < s,
        _ => false,
    }
}

/// Read a lookback period from a strategy section; must be at least 1.
pub(crate) fn config_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, PlaybookError> {
    let value = config.get_int(section, key, default as i64);
    if value < 1 {
        return Err(PlaybookError::invalid(section, key, "period must be at least 1"));
    }
    Ok(value as usize)
}

/// Read a strictly positive number from a strategy section.
pub(crate) fn config_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, PlaybookError> {
    let value = config.get_double(section, key, default);
    if !(value > 0.0 && value.is_finite()) {
        return Err(PlaybookError::invalid(section, key, "must be positive"));
    }
    Ok(value)
}

/// Read a fraction in [0, 1) from a strategy section.
pub(crate) fn config_fraction(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, PlaybookError> {
    let value = config.get_double(section, key, default);
    if !(0.0..1.0).contains(&value) {
        return Err(PlaybookError::invalid(section, key, "must be in [0, 1)"));
    }
    Ok(value)
}

/// Per-playbook risk fraction: `risk_pct` in the strategy section, else the
/// account-wide `[risk] risk_pct`, else `default`.
pub(crate) fn config_risk_pct(
    config: &dyn ConfigPort,
    section: &str,
    default: f64,
) -> Result<f64, PlaybookError> {
    let account = config.get_double("risk", "risk_pct", default);
    let value = config.get_double(section, "risk_pct", account);
    if !(value > 0.0 && value <= 1.0) {
        return Err(PlaybookError::invalid(section, "risk_pct", "must be in (0, 1]"));
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::position::Position;
    use chrono::NaiveDate;

    pub fn long_position(entry: f64, stop: f64) -> Position {
        Position {
            symbol: "TEST".into(),
            quantity: 10,
            entry_price: entry,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            stop_loss: stop,
            entry_commission: 0.0,
            risk_per_share: (entry - stop).abs(),
            entry_type: None,
        }
    }

    /// Bars from explicit (open, high, low, close, volume) rows.
    pub fn ohlcv_rows(rows: &[(f64, f64, f64, f64, i64)]) -> Vec<OhlcvBar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close, volume))| OhlcvBar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume,
            })
            .collect()
    }
}
