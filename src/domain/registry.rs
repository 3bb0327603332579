//! Built-in playbook registry.

use crate::domain::error::PlaybookError;
use crate::domain::playbook::{
    DonchianBreakout, DonchianParams, HtfParams, Ma101, Ma101Params, Playbook, QullamaggieHtf,
    SwingParams, SwingTrading, donchian, htf, ma101, swing,
};
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub enabled: bool,
}

pub fn builtin_strategies() -> Vec<StrategyInfo> {
    vec![
        StrategyInfo {
            id: ma101::ID,
            name: "Moving Averages 101",
            description: "EMA 10/30 crossover above the 200-day SMA; exit below EMA 10 or on RSI overbought",
            enabled: true,
        },
        StrategyInfo {
            id: donchian::ID,
            name: "Donchian Breakout",
            description: "Close beyond the 50-day channel; exit on the opposite 25-day channel",
            enabled: true,
        },
        StrategyInfo {
            id: swing::ID,
            name: "Swing Trading (Trend Variant)",
            description: "EMA 5/20 crossover plus dip-buys at the 50- and 200-day SMA",
            enabled: true,
        },
        StrategyInfo {
            id: htf::ID,
            name: "Qullamaggie High Tight Flag",
            description: "Liquid leader breaking out of a shallow flag after a strong pole, on volume",
            enabled: true,
        },
    ]
}

pub fn is_known(id: &str) -> bool {
    builtin_strategies().iter().any(|s| s.id == id)
}

/// Registry with `[strategies] enabled` applied. Without that key every
/// built-in playbook stays enabled.
pub fn strategy_registry(config: &dyn ConfigPort) -> Result<Vec<StrategyInfo>, PlaybookError> {
    let mut strategies = builtin_strategies();
    if let Some(enabled) = config.get_list("strategies", "enabled") {
        for id in &enabled {
            if !is_known(id) {
                return Err(PlaybookError::UnknownStrategy { id: id.clone() });
            }
        }
        for strategy in &mut strategies {
            strategy.enabled = enabled.iter().any(|id| id == strategy.id);
        }
    }
    Ok(strategies)
}

pub fn get_enabled_strategies(config: &dyn ConfigPort) -> Result<Vec<StrategyInfo>, PlaybookError> {
    Ok(strategy_registry(config)?
        .into_iter()
        .filter(|s| s.enabled)
        .collect())
}

/// Build a playbook by id with parameter overrides from its config section.
pub fn build_playbook(
    id: &str,
    config: &dyn ConfigPort,
) -> Result<Box<dyn Playbook>, PlaybookError> {
    let playbook: Box<dyn Playbook> = match id {
        ma101::ID => Box::new(Ma101::new(Ma101Params::from_config(config, id)?)),
        donchian::ID => Box::new(DonchianBreakout::new(DonchianParams::from_config(
            config, id,
        )?)),
        swing::ID => Box::new(SwingTrading::new(SwingParams::from_config(config, id)?)),
        htf::ID => Box::new(QullamaggieHtf::new(HtfParams::from_config(config, id)?)),
        other => {
            return Err(PlaybookError::UnknownStrategy {
                id: other.to_string(),
            });
        }
    };
    Ok(playbook)
}

/// Playbooks named in `ids`, or every enabled playbook when `ids` is empty.
pub fn select_playbooks(
    ids: &[String],
    config: &dyn ConfigPort,
) -> Result<Vec<Box<dyn Playbook>>, PlaybookError> {
    if ids.is_empty() {
        get_enabled_strategies(config)?
            .iter()
            .map(|s| build_playbook(s.id, config))
            .collect()
    } else {
        ids.iter().map(|id| build_playbook(id, config)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::sizing::RiskConfig;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn all_enabled_by_default() {
        let enabled = get_enabled_strategies(&config("[data]\n")).unwrap();
        let ids: Vec<&str> = enabled.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                "ma101_burns",
                "donchian_breakout",
                "swing_trading_burns",
                "qullamaggie_htf"
            ]
        );
    }

    #[test]
    fn enabled_list_overrides_flags() {
        let cfg = config("[strategies]\nenabled = qullamaggie_htf, ma101_burns\n");
        let registry = strategy_registry(&cfg).unwrap();
        assert_eq!(registry.len(), 4);
        let enabled: Vec<&str> = registry.iter().filter(|s| s.enabled).map(|s| s.id).collect();
        assert_eq!(enabled, vec!["ma101_burns", "qullamaggie_htf"]);
    }

    #[test]
    fn unknown_enabled_id_is_error() {
        let cfg = config("[strategies]\nenabled = ma101_burns, turtle\n");
        assert!(matches!(
            strategy_registry(&cfg),
            Err(PlaybookError::UnknownStrategy { id }) if id == "turtle"
        ));
    }

    #[test]
    fn build_playbook_applies_section() {
        let cfg = config("[donchian_breakout]\nentry_period = 20\n");
        let playbook = build_playbook("donchian_breakout", &cfg).unwrap();
        assert_eq!(playbook.id(), "donchian_breakout");
        assert!(
            playbook
                .parameters()
                .contains(&("entry_period".to_string(), "20".to_string()))
        );
    }

    #[test]
    fn account_risk_pct_sizes_every_playbook() {
        let cfg = config("[risk]\nrisk_pct = 0.002\nmax_position_pct = 1.0\n");
        let risk = RiskConfig::from_config(&cfg).unwrap();
        for info in builtin_strategies() {
            let playbook = build_playbook(info.id, &cfg).unwrap();
            // 100_000 * 0.002 / 2.0 per share
            assert_eq!(playbook.position_size(100.0, 98.0, 100_000.0, &risk), 100);
        }

        let cfg = config(
            "[risk]\nrisk_pct = 0.002\nmax_position_pct = 1.0\n[donchian_breakout]\nrisk_pct = 0.01\n",
        );
        let playbook = build_playbook("donchian_breakout", &cfg).unwrap();
        assert_eq!(playbook.position_size(100.0, 98.0, 100_000.0, &risk), 500);
    }

    #[test]
    fn build_unknown_playbook_is_error() {
        assert!(matches!(
            build_playbook("nope", &config("[data]\n")),
            Err(PlaybookError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn select_playbooks_by_id_or_enabled() {
        let cfg = config("[strategies]\nenabled = swing_trading_burns\n");
        let chosen = select_playbooks(&[], &cfg).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id(), "swing_trading_burns");

        let chosen = select_playbooks(&["ma101_burns".to_string()], &cfg).unwrap();
        assert_eq!(chosen[0].id(), "ma101_burns");
    }

    #[test]
    fn every_builtin_builds_with_defaults() {
        let cfg = config("[data]\n");
        for info in builtin_strategies() {
            let playbook = build_playbook(info.id, &cfg).unwrap();
            assert_eq!(playbook.name(), info.name);
            assert!(playbook.indicator_types().is_ok());
        }
    }
}
