//! Donchian channel breakout (Burns, Buy Signals Sell Signals).
//!
//! Enter on a close beyond the N-day channel, exit on the opposite M-day
//! channel. Channels exclude the current bar.

use super::{
    Playbook, PlaybookDefinition, PlaybookMeta, config_period, config_positive, config_risk_pct,
};
use crate::domain::error::PlaybookError;
use crate::domain::indicator::IndicatorType;
use crate::domain::position::Position;
use crate::domain::signal::{Signal, SignalEvent, SignalFrame};
use crate::ports::config_port::ConfigPort;

pub const ID: &str = "donchian_breakout";

#[derive(Debug, Clone, PartialEq)]
pub struct DonchianParams {
    pub entry_period: usize,
    pub exit_period: usize,
    pub atr_period: usize,
    pub atr_stop_multiple: f64,
    pub use_atr_stop: bool,
    pub allow_shorts: bool,
    pub risk_pct: f64,
}

impl Default for DonchianParams {
    fn default() -> Self {
        DonchianParams {
            entry_period: 50,
            exit_period: 25,
            atr_period: 14,
            atr_stop_multiple: 3.0,
            use_atr_stop: false,
            allow_shorts: false,
            risk_pct: 0.01,
        }
    }
}

impl DonchianParams {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, PlaybookError> {
        let d = DonchianParams::default();
        Ok(DonchianParams {
            entry_period: config_period(config, section, "entry_period", d.entry_period)?,
            exit_period: config_period(config, section, "exit_period", d.exit_period)?,
            atr_period: config_period(config, section, "atr_period", d.atr_period)?,
            atr_stop_multiple: config_positive(
                config,
                section,
                "atr_stop_multiple",
                d.atr_stop_multiple,
            )?,
            use_atr_stop: config.get_bool(section, "use_atr_stop", d.use_atr_stop),
            allow_shorts: config.get_bool(section, "allow_shorts", d.allow_shorts),
            risk_pct: config_risk_pct(config, section, d.risk_pct)?,
        })
    }
}

pub struct DonchianBreakout {
    params: DonchianParams,
    definition: PlaybookDefinition,
}

impl DonchianBreakout {
    pub fn new(params: DonchianParams) -> Self {
        let definition = PlaybookDefinition {
            meta: PlaybookMeta {
                name: "Donchian Breakout".to_string(),
                timeframe: "daily".to_string(),
                asset_class: "stocks, ETFs, futures".to_string(),
                style: "trend following breakout".to_string(),
                source: "Burns, Buy Signals Sell Signals (2015)".to_string(),
            },
            required_indicators: vec![
                format!(
                    "DONCHIAN_HIGH({p}), DONCHIAN_LOW({p})",
                    p = params.entry_period
                ),
                format!(
                    "DONCHIAN_HIGH({p}), DONCHIAN_LOW({p})",
                    p = params.exit_period
                ),
                format!("ATR({})", params.atr_period),
            ],
            risk_pct: params.risk_pct,
            parameters_to_optimize: vec![
                "entry_period".to_string(),
                "exit_period".to_string(),
                "atr_stop_multiple".to_string(),
            ],
        };
        DonchianBreakout { params, definition }
    }

    pub fn params(&self) -> &DonchianParams {
        &self.params
    }

    fn long_event(&self, frame: &SignalFrame<'_>, i: usize, close: f64) -> Option<SignalEvent> {
        let p = &self.params;
        let channel = frame.value(IndicatorType::DonchianHigh(p.entry_period), i)?;
        if close <= channel {
            return None;
        }
        let stop = if p.use_atr_stop {
            close - p.atr_stop_multiple * frame.value(IndicatorType::Atr(p.atr_period), i)?
        } else {
            frame.value(IndicatorType::DonchianLow(p.exit_period), i)?
        };
        Some(SignalEvent::long(
            close,
            stop,
            format!("{}-day breakout high", p.entry_period),
        ))
    }

    fn short_event(&self, frame: &SignalFrame<'_>, i: usize, close: f64) -> Option<SignalEvent> {
        let p = &self.params;
        let channel = frame.value(IndicatorType::DonchianLow(p.entry_period), i)?;
        if close >= channel {
            return None;
        }
        let stop = if p.use_atr_stop {
            close + p.atr_stop_multiple * frame.value(IndicatorType::Atr(p.atr_period), i)?
        } else {
            frame.value(IndicatorType::DonchianHigh(p.exit_period), i)?
        };
        Some(SignalEvent::short(
            close,
            stop,
            format!("{}-day breakdown low", p.entry_period),
        ))
    }
}

impl Default for DonchianBreakout {
    fn default() -> Self {
        DonchianBreakout::new(DonchianParams::default())
    }
}

impl Playbook for DonchianBreakout {
    fn id(&self) -> &'static str {
        ID
    }

    fn definition(&self) -> &PlaybookDefinition {
        &self.definition
    }

    fn parameters(&self) -> Vec<(String, String)> {
        let p = &self.params;
        vec![
            ("entry_period".into(), p.entry_period.to_string()),
            ("exit_period".into(), p.exit_period.to_string()),
            ("atr_period".into(), p.atr_period.to_string()),
            ("atr_stop_multiple".into(), p.atr_stop_multiple.to_string()),
            ("use_atr_stop".into(), p.use_atr_stop.to_string()),
            ("allow_shorts".into(), p.allow_shorts.to_string()),
            ("risk_pct".into(), p.risk_pct.to_string()),
        ]
    }

    fn detect(&self, frame: &mut SignalFrame<'_>) {
        for i in 0..frame.len() {
            let close = frame.bars[i].close;
            let mut event = self.long_event(frame, i, close);
            if self.params.allow_shorts {
                if let Some(short) = self.short_event(frame, i, close) {
                    event = Some(short);
                }
            }
            if let Some(event) = event {
                frame.set_event(i, event);
            }
        }
    }

    fn check_exit(
        &self,
        frame: &SignalFrame<'_>,
        index: usize,
        position: &Position,
    ) -> Option<String> {
        let p = &self.params;
        let close = frame.bars.get(index)?.close;
        if position.is_long() {
            let low = frame.value(IndicatorType::DonchianLow(p.exit_period), index)?;
            (close < low).then(|| format!("close below {}-day low", p.exit_period))
        } else {
            let high = frame.value(IndicatorType::DonchianHigh(p.exit_period), index)?;
            (close > high).then(|| format!("close above {}-day high", p.exit_period))
        }
    }

    fn enrich(&self, frame: &SignalFrame<'_>, index: usize, signal: &mut Signal) {
        signal.atr = frame.value(IndicatorType::Atr(self.params.atr_period), index);
    }
}
