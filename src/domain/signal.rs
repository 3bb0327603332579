//! Signals: per-bar signal events and the daily signal record.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Direction::Long),
            "SHORT" | "SELL" => Ok(Direction::Short),
            other => Err(format!("invalid direction '{}' (expected LONG or SHORT)", other)),
        }
    }
}

/// A signal raised on one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    pub reason: String,
    pub entry_type: Option<String>,
}

impl SignalEvent {
    pub fn long(entry_price: f64, stop_price: f64, reason: impl Into<String>) -> Self {
        SignalEvent {
            direction: Direction::Long,
            entry_price,
            stop_price,
            reason: reason.into(),
            entry_type: None,
        }
    }

    pub fn short(entry_price: f64, stop_price: f64, reason: impl Into<String>) -> Self {
        SignalEvent {
            direction: Direction::Short,
            entry_price,
            stop_price,
            reason: reason.into(),
            entry_type: None,
        }
    }

    pub fn with_entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = Some(entry_type.into());
        self
    }

    pub fn risk_per_share(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }
}

/// Bars, computed indicators and per-bar signal events for one symbol.
#[derive(Debug, Clone)]
pub struct SignalFrame<'a> {
    pub symbol: String,
    pub bars: &'a [OhlcvBar],
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
    pub events: Vec<Option<SignalEvent>>,
}

impl<'a> SignalFrame<'a> {
    pub fn new(bars: &'a [OhlcvBar], indicators: HashMap<IndicatorType, IndicatorSeries>) -> Self {
        SignalFrame {
            symbol: bars.first().map(|b| b.symbol.clone()).unwrap_or_default(),
            bars,
            indicators,
            events: vec![None; bars.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Indicator value at `index`; `None` if not computed or still warming up.
    pub fn value(&self, indicator: IndicatorType, index: usize) -> Option<f64> {
        self.indicators.get(&indicator)?.value_at(index)
    }

    pub fn event(&self, index: usize) -> Option<&SignalEvent> {
        self.events.get(index)?.as_ref()
    }

    pub fn has_event(&self, index: usize) -> bool {
        self.event(index).is_some()
    }

    pub fn set_event(&mut self, index: usize, event: SignalEvent) {
        if let Some(slot) = self.events.get_mut(index) {
            *slot = Some(event);
        }
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    pub fn signal_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_some()).count()
    }

    /// The last `n` signal events with their bars, oldest first.
    pub fn recent_events(&self, n: usize) -> Vec<(&OhlcvBar, &SignalEvent)> {
        let mut out: Vec<(&OhlcvBar, &SignalEvent)> = self
            .bars
            .iter()
            .zip(&self.events)
            .rev()
            .filter_map(|(bar, ev)| ev.as_ref().map(|e| (bar, e)))
            .take(n)
            .collect();
        out.reverse();
        out
    }
}

/// One row of the daily signals file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub date: NaiveDate,
    pub symbol: String,
    pub strategy_id: String,
    pub strategy: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    pub risk_per_share: f64,
    pub shares: i64,
    pub reason: String,
    pub entry_type: Option<String>,
    pub atr: Option<f64>,
    pub rsi: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub dollar_volume: Option<f64>,
    pub pole_move_pct: Option<f64>,
}

impl Signal {
    pub fn from_event(
        bar: &OhlcvBar,
        strategy_id: &str,
        strategy: &str,
        event: &SignalEvent,
    ) -> Self {
        Signal {
            date: bar.date,
            symbol: bar.symbol.clone(),
            strategy_id: strategy_id.to_string(),
            strategy: strategy.to_string(),
            direction: event.direction,
            entry_price: event.entry_price,
            stop_price: event.stop_price,
            risk_per_share: event.risk_per_share(),
            shares: 0,
            reason: event.reason.clone(),
            entry_type: event.entry_type.clone(),
            atr: None,
            rsi: None,
            volume_ratio: None,
            dollar_volume: None,
            pole_move_pct: None,
        }
    }
}
