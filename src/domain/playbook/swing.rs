//! Ultimate Guide to Swing Trading (Burns), trend variant.
//!
//! Three long entry patterns, checked in order; a later pattern only fills
//! bars the earlier ones left empty:
//! 1. fast/slow EMA crossover, stop at the slow EMA
//! 2. dip to the 50-day SMA that closes back above it, stop 2% under the SMA
//! 3. the same dip against the 200-day SMA, stop 3% under the SMA

use super::{
    Playbook, PlaybookDefinition, PlaybookMeta, config_period, config_positive, config_risk_pct,
    crossed_above, crossed_below,
};
use crate::domain::error::PlaybookError;
use crate::domain::indicator::IndicatorType;
use crate::domain::position::Position;
use crate::domain::signal::{Signal, SignalEvent, SignalFrame};
use crate::ports::config_port::ConfigPort;
use std::fmt;
use std::str::FromStr;

pub const ID: &str = "swing_trading_burns";

const DIP_50_STOP: f64 = 0.98;
const DIP_200_STOP: f64 = 0.97;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    All,
    Crossover,
    Dip50,
    Dip200,
}

impl EntryMode {
    fn allows(self, pattern: EntryMode) -> bool {
        self == EntryMode::All || self == pattern
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryMode::All => "all",
            EntryMode::Crossover => "crossover",
            EntryMode::Dip50 => "dip_50",
            EntryMode::Dip200 => "dip_200",
        })
    }
}

impl FromStr for EntryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(EntryMode::All),
            "crossover" => Ok(EntryMode::Crossover),
            "dip_50" => Ok(EntryMode::Dip50),
            "dip_200" => Ok(EntryMode::Dip200),
            other => Err(format!(
                "unknown entry mode '{}' (expected all, crossover, dip_50 or dip_200)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwingParams {
    pub fast_ema: usize,
    pub slow_ema: usize,
    pub ma_50: usize,
    pub ma_200: usize,
    pub rsi_period: usize,
    pub rsi_profit_target: f64,
    pub atr_period: usize,
    pub entry_mode: EntryMode,
    pub risk_pct: f64,
}

impl Default for SwingParams {
    fn default() -> Self {
        SwingParams {
            fast_ema: 5,
            slow_ema: 20,
            ma_50: 50,
            ma_200: 200,
            rsi_period: 14,
            rsi_profit_target: 70.0,
            atr_period: 14,
            entry_mode: EntryMode::All,
            risk_pct: 0.01,
        }
    }
}

impl SwingParams {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, PlaybookError> {
        let d = SwingParams::default();
        let entry_mode = match config.get_string(section, "entry_mode") {
            Some(raw) => raw
                .parse()
                .map_err(|reason: String| PlaybookError::invalid(section, "entry_mode", reason))?,
            None => d.entry_mode,
        };
        let params = SwingParams {
            fast_ema: config_period(config, section, "fast_ema", d.fast_ema)?,
            slow_ema: config_period(config, section, "slow_ema", d.slow_ema)?,
            ma_50: config_period(config, section, "ma_50", d.ma_50)?,
            ma_200: config_period(config, section, "ma_200", d.ma_200)?,
            rsi_period: config_period(config, section, "rsi_period", d.rsi_period)?,
            rsi_profit_target: config_positive(
                config,
                section,
                "rsi_profit_target",
                d.rsi_profit_target,
            )?,
            atr_period: config_period(config, section, "atr_period", d.atr_period)?,
            entry_mode,
            risk_pct: config_risk_pct(config, section, d.risk_pct)?,
        };
        if params.fast_ema >= params.slow_ema {
            return Err(PlaybookError::invalid(
                section,
                "fast_ema",
                "fast EMA must be shorter than slow EMA",
            ));
        }
        Ok(params)
    }
}

pub struct SwingTrading {
    params: SwingParams,
    definition: PlaybookDefinition,
}

impl SwingTrading {
    pub fn new(params: SwingParams) -> Self {
        let definition = PlaybookDefinition {
            meta: PlaybookMeta {
                name: "Swing Trading (Trend Variant)".to_string(),
                timeframe: "daily".to_string(),
                asset_class: "stocks, ETFs".to_string(),
                style: "swing, trend pullback".to_string(),
                source: "Burns, The Ultimate Guide to Swing Trading (2021)".to_string(),
            },
            required_indicators: vec![
                format!("EMA({}), EMA({})", params.fast_ema, params.slow_ema),
                format!("SMA({}), SMA({})", params.ma_50, params.ma_200),
                format!("RSI({})", params.rsi_period),
                format!("ATR({})", params.atr_period),
            ],
            risk_pct: params.risk_pct,
            parameters_to_optimize: vec![
                "fast_ema".to_string(),
                "slow_ema".to_string(),
                "rsi_profit_target".to_string(),
                "entry_mode".to_string(),
            ],
        };
        SwingTrading { params, definition }
    }

    pub fn params(&self) -> &SwingParams {
        &self.params
    }

    /// Low touches the average, close holds above it, and the prior close was above it too.
    fn is_dip(frame: &SignalFrame<'_>, average: IndicatorType, i: usize) -> bool {
        if i == 0 {
            return false;
        }
        let (bar, prev) = (&frame.bars[i], &frame.bars[i - 1]);
        match (frame.value(average, i), frame.value(average, i - 1)) {
            (Some(ma), Some(prev_ma)) => bar.low <= ma && bar.close > ma && prev.close > prev_ma,
            _ => false,
        }
    }

    fn reference_average(&self, entry_type: Option<&str>) -> (IndicatorType, String) {
        let p = &self.params;
        match entry_type {
            Some("dip_50") => (IndicatorType::Sma(p.ma_50), format!("SMA {}", p.ma_50)),
            Some("dip_200") => (IndicatorType::Sma(p.ma_200), format!("SMA {}", p.ma_200)),
            _ => (IndicatorType::Ema(p.slow_ema), format!("EMA {}", p.slow_ema)),
        }
    }
}

impl Default for SwingTrading {
    fn default() -> Self {
        SwingTrading::new(SwingParams::default())
    }
}

impl Playbook for SwingTrading {
    fn id(&self) -> &'static str {
        ID
    }

    fn definition(&self) -> &PlaybookDefinition {
        &self.definition
    }

    fn parameters(&self) -> Vec<(String, String)> {
        let p = &self.params;
        vec![
            ("fast_ema".into(), p.fast_ema.to_string()),
            ("slow_ema".into(), p.slow_ema.to_string()),
            ("ma_50".into(), p.ma_50.to_string()),
            ("ma_200".into(), p.ma_200.to_string()),
            ("rsi_period".into(), p.rsi_period.to_string()),
            ("rsi_profit_target".into(), p.rsi_profit_target.to_string()),
            ("atr_period".into(), p.atr_period.to_string()),
            ("entry_mode".into(), p.entry_mode.to_string()),
            ("risk_pct".into(), p.risk_pct.to_string()),
        ]
    }

    fn detect(&self, frame: &mut SignalFrame<'_>) {
        let p = &self.params;
        let fast = IndicatorType::Ema(p.fast_ema);
        let slow = IndicatorType::Ema(p.slow_ema);
        let sma_50 = IndicatorType::Sma(p.ma_50);
        let sma_200 = IndicatorType::Sma(p.ma_200);

        for i in 0..frame.len() {
            let close = frame.bars[i].close;

            if p.entry_mode.allows(EntryMode::Crossover) && crossed_above(frame, fast, slow, i) {
                if let Some(stop) = frame.value(slow, i) {
                    let reason = format!("EMA {}/{} bullish cross", p.fast_ema, p.slow_ema);
                    frame.set_event(
                        i,
                        SignalEvent::long(close, stop, reason).with_entry_type("crossover"),
                    );
                    continue;
                }
            }

            if p.entry_mode.allows(EntryMode::Dip50) && Self::is_dip(frame, sma_50, i) {
                if let Some(ma) = frame.value(sma_50, i) {
                    let reason = format!("{}-day MA dip-buy (bounce)", p.ma_50);
                    frame.set_event(
                        i,
                        SignalEvent::long(close, ma * DIP_50_STOP, reason).with_entry_type("dip_50"),
                    );
                    continue;
                }
            }

            if p.entry_mode.allows(EntryMode::Dip200) && Self::is_dip(frame, sma_200, i) {
                if let Some(ma) = frame.value(sma_200, i) {
                    let reason = format!("{}-day MA deep dip-buy", p.ma_200);
                    frame.set_event(
                        i,
                        SignalEvent::long(close, ma * DIP_200_STOP, reason)
                            .with_entry_type("dip_200"),
                    );
                }
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

        if crossed_below(
            frame,
            IndicatorType::Ema(p.fast_ema),
            IndicatorType::Ema(p.slow_ema),
            index,
        ) {
            return Some(format!("EMA {}/{} bearish cross", p.fast_ema, p.slow_ema));
        }
        if let Some(rsi) = frame.value(IndicatorType::Rsi(p.rsi_period), index) {
            if rsi >= p.rsi_profit_target {
                return Some(format!("RSI {:.1} >= {}", rsi, p.rsi_profit_target));
            }
        }
        let (average, label) = self.reference_average(position.entry_type.as_deref());
        let level = frame.value(average, index)?;
        (close < level).then(|| format!("close below {}", label))
    }

    fn enrich(&self, frame: &SignalFrame<'_>, index: usize, signal: &mut Signal) {
        signal.atr = frame.value(IndicatorType::Atr(self.params.atr_period), index);
        signal.rsi = frame.value(IndicatorType::Rsi(self.params.rsi_period), index);
    }
}
