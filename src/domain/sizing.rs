//! Fixed-fractional position sizing.

use crate::domain::config_validation::validate_risk_config;
use crate::domain::error::PlaybookError;
use crate::ports::config_port::ConfigPort;

/// Account-level risk limits, read from the `[risk]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Fraction of equity risked per trade. A playbook section can set its own.
    pub risk_pct: f64,
    /// Cap on position value as a fraction of equity.
    pub max_position_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            risk_pct: 0.01,
            max_position_pct: 0.02,
        }
    }
}

impl RiskConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PlaybookError> {
        validate_risk_config(config)?;
        let d = RiskConfig::default();
        Ok(RiskConfig {
            risk_pct: config.get_double("risk", "risk_pct", d.risk_pct),
            max_position_pct: config.get_double("risk", "max_position_pct", d.max_position_pct),
        })
    }
}

/// Account equity used to size live signals, from `[risk] account_equity`.
pub fn account_equity(config: &dyn ConfigPort) -> f64 {
    config.get_double("risk", "account_equity", 100_000.0)
}

/// Number of whole shares to buy so that a stop-out loses `equity * risk_pct`,
/// capped so the position value stays within `equity * max_position_pct`.
///
/// Returns 0 when entry and stop coincide or inputs are not positive.
pub fn calculate_position_size(
    entry_price: f64,
    stop_price: f64,
    equity: f64,
    risk_pct: f64,
    risk: &RiskConfig,
) -> i64 {
    if !(entry_price > 0.0 && equity > 0.0 && risk_pct > 0.0) {
        return 0;
    }

    let risk_per_share = (entry_price - stop_price).abs();
    if risk_per_share == 0.0 || !risk_per_share.is_finite() {
        return 0;
    }

    let risk_dollars = equity * risk_pct;
    let shares = (risk_dollars / risk_per_share).floor() as i64;
    let max_shares = ((equity * risk.max_position_pct) / entry_price).floor() as i64;

    shares.min(max_shares).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capped_by_max_position() {
        // risk: 1000 / 2 = 500 shares; cap: 2000 / 100 = 20 shares
        let shares = calculate_position_size(100.0, 98.0, 100_000.0, 0.01, &RiskConfig::default());
        assert_eq!(shares, 20);
    }

    #[test]
    fn limited_by_risk() {
        let risk = RiskConfig {
            risk_pct: 0.01,
            max_position_pct: 1.0,
        };
        // 1000 / 4 = 250 shares; cap 1000 shares
        assert_eq!(calculate_position_size(100.0, 96.0, 100_000.0, 0.01, &risk), 250);
    }

    #[test]
    fn short_side_uses_absolute_risk() {
        let risk = RiskConfig {
            risk_pct: 0.01,
            max_position_pct: 1.0,
        };
        assert_eq!(calculate_position_size(100.0, 104.0, 100_000.0, 0.01, &risk), 250);
    }

    #[test]
    fn zero_risk_per_share_is_zero() {
        assert_eq!(
            calculate_position_size(100.0, 100.0, 100_000.0, 0.01, &RiskConfig::default()),
            0
        );
    }

    #[test]
    fn from_config_reads_risk_section() {
        let cfg = crate::adapters::file_config_adapter::FileConfigAdapter::from_string(
            "[risk]\naccount_equity = 25000\nmax_position_pct = 0.1\n",
        )
        .unwrap();
        let risk = RiskConfig::from_config(&cfg).unwrap();
        assert!((risk.risk_pct - 0.01).abs() < f64::EPSILON);
        assert!((risk.max_position_pct - 0.1).abs() < f64::EPSILON);
        assert!((account_equity(&cfg) - 25000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_positive_inputs_are_zero() {
        let risk = RiskConfig::default();
        assert_eq!(calculate_position_size(0.0, -1.0, 100_000.0, 0.01, &risk), 0);
        assert_eq!(calculate_position_size(100.0, 95.0, 0.0, 0.01, &risk), 0);
        assert_eq!(calculate_position_size(100.0, 95.0, 1000.0, 0.0, &risk), 0);
    }
}
