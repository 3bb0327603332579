//! Qullamaggie high tight flag: breakout continuation in strong leaders.
//!
//! A signal needs a liquid leader above its trend average, a strong prior
//! move (the pole), a shallow consolidation near the highs (the flag) and a
//! breakout above the flag high on expanding volume.

use super::{
    Playbook, PlaybookDefinition, PlaybookMeta, config_fraction, config_period, config_positive,
    config_risk_pct,
};
use crate::domain::error::PlaybookError;
use crate::domain::indicator::IndicatorType;
use crate::domain::position::Position;
use crate::domain::signal::{Signal, SignalEvent, SignalFrame};
use crate::ports::config_port::ConfigPort;

pub const ID: &str = "qullamaggie_htf";

const REASON: &str = "HTF breakout: strong leader, pole+flag, volume";

#[derive(Debug, Clone, PartialEq)]
pub struct HtfParams {
    pub ema_period: usize,
    pub sma_period: usize,
    pub trend_sma_period: usize,
    pub flag_window: usize,
    pub volume_lookback: usize,
    pub volume_multiplier: f64,
    pub min_dollar_volume: f64,
    pub pole_lookback: usize,
    pub min_pole_move: f64,
    pub near_high_tolerance: f64,
    pub max_flag_retrace: f64,
    pub risk_pct: f64,
}

impl Default for HtfParams {
    fn default() -> Self {
        HtfParams {
            ema_period: 10,
            sma_period: 20,
            trend_sma_period: 50,
            flag_window: 20,
            volume_lookback: 20,
            volume_multiplier: 1.5,
            min_dollar_volume: 50_000_000.0,
            pole_lookback: 40,
            min_pole_move: 0.50,
            near_high_tolerance: 0.10,
            max_flag_retrace: 0.25,
            risk_pct: 0.01,
        }
    }
}

impl HtfParams {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, PlaybookError> {
        let d = HtfParams::default();
        Ok(HtfParams {
            ema_period: config_period(config, section, "ema_period", d.ema_period)?,
            sma_period: config_period(config, section, "sma_period", d.sma_period)?,
            trend_sma_period: config_period(
                config,
                section,
                "trend_sma_period",
                d.trend_sma_period,
            )?,
            flag_window: config_period(config, section, "flag_window", d.flag_window)?,
            volume_lookback: config_period(config, section, "volume_lookback", d.volume_lookback)?,
            volume_multiplier: config_positive(
                config,
                section,
                "volume_multiplier",
                d.volume_multiplier,
            )?,
            min_dollar_volume: config_positive(
                config,
                section,
                "min_dollar_volume",
                d.min_dollar_volume,
            )?,
            pole_lookback: config_period(config, section, "pole_lookback", d.pole_lookback)?,
            min_pole_move: config_positive(config, section, "min_pole_move", d.min_pole_move)?,
            near_high_tolerance: config_fraction(
                config,
                section,
                "near_high_tolerance",
                d.near_high_tolerance,
            )?,
            max_flag_retrace: config_fraction(
                config,
                section,
                "max_flag_retrace",
                d.max_flag_retrace,
            )?,
            risk_pct: config_risk_pct(config, section, d.risk_pct)?,
        })
    }
}

pub struct QullamaggieHtf {
    params: HtfParams,
    definition: PlaybookDefinition,
}

impl QullamaggieHtf {
    pub fn new(params: HtfParams) -> Self {
        let definition = PlaybookDefinition {
            meta: PlaybookMeta {
                name: "Qullamaggie High Tight Flag".to_string(),
                timeframe: "daily".to_string(),
                asset_class: "stocks".to_string(),
                style: "momentum breakout".to_string(),
                source: "Qullamaggie plan suite".to_string(),
            },
            required_indicators: vec![
                format!(
                    "EMA({}) SMA({}) SMA({})",
                    params.ema_period, params.sma_period, params.trend_sma_period
                ),
                format!(
                    "VOLUME_SMA({v}) DOLLAR_VOLUME_SMA({v})",
                    v = params.volume_lookback
                ),
                format!(
                    "HIGHEST_HIGH({f}) LOWEST_LOW({f})",
                    f = params.flag_window
                ),
                format!("CHANGE({})", params.pole_lookback),
            ],
            risk_pct: params.risk_pct,
            parameters_to_optimize: vec![
                "volume_multiplier".to_string(),
                "min_pole_move".to_string(),
                "max_flag_retrace".to_string(),
            ],
        };
        QullamaggieHtf { params, definition }
    }

    pub fn params(&self) -> &HtfParams {
        &self.params
    }

    fn volume_ratio(&self, frame: &SignalFrame<'_>, i: usize) -> Option<f64> {
        let avg = frame.value(IndicatorType::VolumeSma(self.params.volume_lookback), i)?;
        (avg > 0.0).then(|| frame.bars[i].volume as f64 / avg)
    }

    fn is_breakout(&self, frame: &SignalFrame<'_>, i: usize) -> Option<bool> {
        let p = &self.params;
        if i == 0 {
            return Some(false);
        }
        let bar = &frame.bars[i];
        let close = bar.close;

        let dollar_volume = frame.value(IndicatorType::DollarVolumeSma(p.volume_lookback), i)?;
        let trend = frame.value(IndicatorType::Sma(p.trend_sma_period), i)?;
        let pole = frame.value(IndicatorType::Change(p.pole_lookback), i)?;
        let flag_high = frame.value(IndicatorType::HighestHigh(p.flag_window), i)?;
        let flag_low = frame.value(IndicatorType::LowestLow(p.flag_window), i)?;
        let prev_flag_high = frame.value(IndicatorType::HighestHigh(p.flag_window), i - 1)?;
        let ema = frame.value(IndicatorType::Ema(p.ema_period), i)?;
        let sma = frame.value(IndicatorType::Sma(p.sma_period), i)?;
        let volume_ratio = self.volume_ratio(frame, i)?;

        let liquid = dollar_volume >= p.min_dollar_volume;
        let uptrend = close > trend;
        let strong_pole = pole >= p.min_pole_move;
        let near_high = close >= flag_high * (1.0 - p.near_high_tolerance);
        let shallow_flag = flag_high > 0.0 && 1.0 - flag_low / flag_high <= p.max_flag_retrace;
        let tight = close >= ema && close >= sma;
        let breakout = bar.high > prev_flag_high;
        let volume_surge = volume_ratio >= p.volume_multiplier;

        Some(
            liquid
                && uptrend
                && strong_pole
                && near_high
                && shallow_flag
                && tight
                && breakout
                && volume_surge,
        )
    }
}

impl Default for QullamaggieHtf {
    fn default() -> Self {
        QullamaggieHtf::new(HtfParams::default())
    }
}

impl Playbook for QullamaggieHtf {
    fn id(&self) -> &'static str {
        ID
    }

    fn definition(&self) -> &PlaybookDefinition {
        &self.definition
    }

    fn parameters(&self) -> Vec<(String, String)> {
        let p = &self.params;
        vec![
            ("ema_period".into(), p.ema_period.to_string()),
            ("sma_period".into(), p.sma_period.to_string()),
            ("trend_sma_period".into(), p.trend_sma_period.to_string()),
            ("flag_window".into(), p.flag_window.to_string()),
            ("volume_lookback".into(), p.volume_lookback.to_string()),
            ("volume_multiplier".into(), p.volume_multiplier.to_string()),
            ("min_dollar_volume".into(), p.min_dollar_volume.to_string()),
            ("pole_lookback".into(), p.pole_lookback.to_string()),
            ("min_pole_move".into(), p.min_pole_move.to_string()),
            ("near_high_tolerance".into(), p.near_high_tolerance.to_string()),
            ("max_flag_retrace".into(), p.max_flag_retrace.to_string()),
            ("risk_pct".into(), p.risk_pct.to_string()),
        ]
    }

    fn detect(&self, frame: &mut SignalFrame<'_>) {
        for i in 0..frame.len() {
            if self.is_breakout(frame, i) == Some(true) {
                let bar = &frame.bars[i];
                frame.set_event(i, SignalEvent::long(bar.high, bar.low, REASON));
            }
        }
    }

    fn check_exit(
        &self,
        frame: &SignalFrame<'_>,
        index: usize,
        _position: &Position,
    ) -> Option<String> {
        let p = &self.params;
        let close = frame.bars.get(index)?.close;
        if frame
            .value(IndicatorType::Ema(p.ema_period), index)
            .is_some_and(|ema| close < ema)
        {
            return Some(format!("close below EMA {}", p.ema_period));
        }
        if frame
            .value(IndicatorType::Sma(p.sma_period), index)
            .is_some_and(|sma| close < sma)
        {
            return Some(format!("close below SMA {}", p.sma_period));
        }
        None
    }

    fn enrich(&self, frame: &SignalFrame<'_>, index: usize, signal: &mut Signal) {
        let p = &self.params;
        signal.volume_ratio = self.volume_ratio(frame, index);
        signal.dollar_volume = frame.value(IndicatorType::DollarVolumeSma(p.volume_lookback), index);
        signal.pole_move_pct = frame
            .value(IndicatorType::Change(p.pole_lookback), index)
            .map(|change| change * 100.0);
    }
}
