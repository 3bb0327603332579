//! Moving Averages 101 (Burns): EMA crossover trend following above a long SMA.

use super::{
    Playbook, PlaybookDefinition, PlaybookMeta, config_period, config_positive, config_risk_pct,
    crossed_above,
};
use crate::domain::error::PlaybookError;
use crate::domain::indicator::IndicatorType;
use crate::domain::position::Position;
use crate::domain::signal::{Signal, SignalEvent, SignalFrame};
use crate::ports::config_port::ConfigPort;

pub const ID: &str = "ma101_burns";

const ATR_PERIOD: usize = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct Ma101Params {
    pub regime_ma: usize,
    pub fast_ema: usize,
    pub slow_ema: usize,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub stop_ma: usize,
    pub risk_pct: f64,
}

impl Default for Ma101Params {
    fn default() -> Self {
        Ma101Params {
            regime_ma: 200,
            fast_ema: 10,
            slow_ema: 30,
            rsi_period: 14,
            rsi_overbought: 70.0,
            stop_ma: 10,
            risk_pct: 0.01,
        }
    }
}

impl Ma101Params {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, PlaybookError> {
        let d = Ma101Params::default();
        let params = Ma101Params {
            regime_ma: config_period(config, section, "regime_ma", d.regime_ma)?,
            fast_ema: config_period(config, section, "fast_ema", d.fast_ema)?,
            slow_ema: config_period(config, section, "slow_ema", d.slow_ema)?,
            rsi_period: config_period(config, section, "rsi_period", d.rsi_period)?,
            rsi_overbought: config_positive(config, section, "rsi_overbought", d.rsi_overbought)?,
            stop_ma: config_period(config, section, "stop_ma", d.stop_ma)?,
            risk_pct: config_risk_pct(config, section, d.risk_pct)?,
        };
        if params.fast_ema >= params.slow_ema {
            return Err(PlaybookError::invalid(
                section,
                "fast_ema",
                format!(
                    "fast EMA ({}) must be shorter than slow EMA ({})",
                    params.fast_ema, params.slow_ema
                ),
            ));
        }
        Ok(params)
    }
}

pub struct Ma101 {
    params: Ma101Params,
    definition: PlaybookDefinition,
}

impl Ma101 {
    pub fn new(params: Ma101Params) -> Self {
        let definition = PlaybookDefinition {
            meta: PlaybookMeta {
                name: "Moving Averages 101".to_string(),
                timeframe: "daily".to_string(),
                asset_class: "stocks, ETFs".to_string(),
                style: "trend following".to_string(),
                source: "Burns, Moving Averages 101 (2015)".to_string(),
            },
            required_indicators: vec![
                format!("SMA({})", params.regime_ma),
                format!(
                    "EMA({}) EMA({}) EMA({})",
                    params.fast_ema, params.slow_ema, params.stop_ma
                ),
                format!("RSI({})", params.rsi_period),
                format!("ATR({})", ATR_PERIOD),
            ],
            risk_pct: params.risk_pct,
            parameters_to_optimize: vec![
                "regime_ma".to_string(),
                "fast_ema".to_string(),
                "slow_ema".to_string(),
                "stop_ma".to_string(),
            ],
        };
        Ma101 { params, definition }
    }

    pub fn params(&self) -> &Ma101Params {
        &self.params
    }
}

impl Default for Ma101 {
    fn default() -> Self {
        Ma101::new(Ma101Params::default())
    }
}

impl Playbook for Ma101 {
    fn id(&self) -> &'static str {
        ID
    }

    fn definition(&self) -> &PlaybookDefinition {
        &self.definition
    }

    fn parameters(&self) -> Vec<(String, String)> {
        let p = &self.params;
        vec![
            ("regime_ma".into(), p.regime_ma.to_string()),
            ("fast_ema".into(), p.fast_ema.to_string()),
            ("slow_ema".into(), p.slow_ema.to_string()),
            ("rsi_period".into(), p.rsi_period.to_string()),
            ("rsi_overbought".into(), p.rsi_overbought.to_string()),
            ("stop_ma".into(), p.stop_ma.to_string()),
            ("risk_pct".into(), p.risk_pct.to_string()),
        ]
    }

    fn detect(&self, frame: &mut SignalFrame<'_>) {
        let p = &self.params;
        let regime = IndicatorType::Sma(p.regime_ma);
        let fast = IndicatorType::Ema(p.fast_ema);
        let slow = IndicatorType::Ema(p.slow_ema);
        let stop = IndicatorType::Ema(p.stop_ma);
        let reason = format!(
            "EMA {}/{} cross above, price > SMA {}",
            p.fast_ema, p.slow_ema, p.regime_ma
        );

        for i in 0..frame.len() {
            let close = frame.bars[i].close;
            let above_regime = frame.value(regime, i).is_some_and(|sma| close > sma);
            if !above_regime || !crossed_above(frame, fast, slow, i) {
                continue;
            }
            if let Some(stop_price) = frame.value(stop, i) {
                frame.set_event(i, SignalEvent::long(close, stop_price, reason.clone()));
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

        if let Some(stop) = frame.value(IndicatorType::Ema(p.stop_ma), index) {
            if close < stop {
                return Some(format!("close below EMA {}", p.stop_ma));
            }
        }
        if let Some(rsi) = frame.value(IndicatorType::Rsi(p.rsi_period), index) {
            if rsi > p.rsi_overbought {
                return Some(format!("RSI {:.1} > {}", rsi, p.rsi_overbought));
            }
        }
        None
    }

    fn enrich(&self, frame: &SignalFrame<'_>, index: usize, signal: &mut Signal) {
        signal.atr = frame.value(IndicatorType::Atr(ATR_PERIOD), index);
    }
}
