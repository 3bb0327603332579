//! Configuration validation.
//!
//! Checks config values before any pipeline runs. Each validator returns the
//! first problem it finds.

use crate::domain::error::PlaybookError;
use crate::domain::registry::{build_playbook, get_enabled_strategies};
use crate::domain::universe::{list_universes, resolve_universe};
use crate::domain::watchlist::ScanFilter;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything the daily commands read: risk, scan, strategies, universes, fetch.
pub fn validate_app_config(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    validate_risk_config(config)?;
    ScanFilter::from_config(config)?;
    validate_strategies(config)?;
    validate_universes(config)?;
    validate_fetch(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    validate_risk_free_rate(config)?;
    validate_positions(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    if config.get_double("risk", "account_equity", 100_000.0) <= 0.0 {
        return Err(PlaybookError::invalid(
            "risk",
            "account_equity",
            "account_equity must be positive",
        ));
    }
    for (key, default) in [("risk_pct", 0.01), ("max_position_pct", 0.02)] {
        let value = config.get_double("risk", key, default);
        if !(value > 0.0 && value <= 1.0) {
            return Err(PlaybookError::invalid(
                "risk",
                key,
                format!("{} must be in (0, 1]", key),
            ));
        }
    }
    Ok(())
}

fn validate_strategies(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    for info in get_enabled_strategies(config)? {
        let playbook = build_playbook(info.id, config)?;
        playbook.indicator_types()?;
    }
    Ok(())
}

fn validate_universes(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    list_universes(config)?;
    resolve_universe(config, None)?;
    Ok(())
}

pub fn validate_fetch(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    if config.get_int("fetch", "lookback_days", 3650) < 1 {
        return Err(PlaybookError::invalid(
            "fetch",
            "lookback_days",
            "lookback_days must be at least 1",
        ));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    if config.get_double("backtest", "initial_capital", 100_000.0) <= 0.0 {
        return Err(PlaybookError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    for key in ["commission_per_trade", "commission_pct"] {
        if config.get_double("backtest", key, 0.0) < 0.0 {
            return Err(PlaybookError::invalid(
                "backtest",
                key,
                format!("{} must be non-negative", key),
            ));
        }
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    if config.get_double("backtest", "slippage_pct", 0.0) < 0.0 {
        return Err(PlaybookError::invalid(
            "backtest",
            "slippage_pct",
            "slippage_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.05);
    if !(0.0..1.0).contains(&value) {
        return Err(PlaybookError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_positions(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    if config.get_int("backtest", "max_positions", 5) < 1 {
        return Err(PlaybookError::invalid(
            "backtest",
            "max_positions",
            "max_positions must be at least 1",
        ));
    }
    if config.get_int("backtest", "max_hold_days", 0) < 0 {
        return Err(PlaybookError::invalid(
            "backtest",
            "max_hold_days",
            "max_hold_days must be non-negative",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(PlaybookError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

/// Parse a required `[backtest]` date.
pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, PlaybookError> {
    let s = value.ok_or_else(|| PlaybookError::missing("backtest", field))?;
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| {
        PlaybookError::invalid(
            "backtest",
            field,
            format!("invalid {} format, expected YYYY-MM-DD", field),
        )
    })
}
