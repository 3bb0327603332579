//! Symbol universes.
//!
//! Universes are named comma lists in the `[universes]` config section. The
//! `default` key names the universe used when none is given; without it the
//! built-in index ETF list applies.

use crate::domain::error::PlaybookError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

pub const SECTION: &str = "universes";

pub const FALLBACK_SYMBOLS: [&str; 3] = ["SPY", "QQQ", "IWM"];

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub name: String,
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

fn load_named(config: &dyn ConfigPort, name: &str) -> Result<Option<Universe>, PlaybookError> {
    if name == "default" {
        return Ok(None);
    }
    let Some(raw) = config.get_string(SECTION, name) else {
        return Ok(None);
    };
    let symbols =
        parse_symbols(&raw).map_err(|e| PlaybookError::invalid(SECTION, name, e.to_string()))?;
    Ok(Some(Universe {
        name: name.to_lowercase(),
        symbols,
    }))
}

/// Resolve a universe by name.
///
/// With no name, or the name `default`: the universe named by the `default`
/// key, then the fallback list. Any other name that is not configured is an
/// error.
pub fn resolve_universe(
    config: &dyn ConfigPort,
    name: Option<&str>,
) -> Result<Universe, PlaybookError> {
    let name = name.filter(|n| !n.trim().eq_ignore_ascii_case("default"));
    if let Some(name) = name {
        return load_named(config, name)?.ok_or_else(|| PlaybookError::UnknownUniverse {
            name: name.to_string(),
        });
    }

    if let Some(default) = config.get_string(SECTION, "default") {
        return load_named(config, &default)?
            .ok_or(PlaybookError::UnknownUniverse { name: default });
    }

    Ok(Universe {
        name: "default".to_string(),
        symbols: FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Every configured universe, sorted by name.
pub fn list_universes(config: &dyn ConfigPort) -> Result<Vec<Universe>, PlaybookError> {
    let mut out = Vec::new();
    for key in config.section_keys(SECTION) {
        if let Some(universe) = load_named(config, &key)? {
            out.push(universe);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    LoadFailed(String),
    InsufficientBars { bars: usize, minimum: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoData => f.write_str("no data"),
            SkipReason::LoadFailed(reason) => write!(f, "load failed: {}", reason),
            SkipReason::InsufficientBars { bars, minimum } => {
                write!(f, "only {} bars, minimum {}", bars, minimum)
            }
        }
    }
}

pub struct UniverseValidationResult {
    pub symbols: Vec<String>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Keep the symbols with at least `min_bars` bars in the date range.
pub fn validate_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_bars: usize,
) -> Result<UniverseValidationResult, PlaybookError> {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let reason = match data_port.fetch_ohlcv(symbol, start_date, end_date) {
            Err(e) => Some(SkipReason::LoadFailed(e.to_string())),
            Ok(bars) if bars.is_empty() => Some(SkipReason::NoData),
            Ok(bars) if bars.len() < min_bars => Some(SkipReason::InsufficientBars {
                bars: bars.len(),
                minimum: min_bars,
            }),
            Ok(bars) => {
                info!(symbol = %symbol, bars = bars.len(), "universe member ok");
                None
            }
        };
        match reason {
            Some(reason) => {
                warn!(symbol = %symbol, %reason, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason,
                });
            }
            None => valid.push(symbol.clone()),
        }
    }

    if valid.is_empty() {
        return Err(PlaybookError::InsufficientData {
            symbol: "all".to_string(),
            bars: 0,
            minimum: min_bars,
        });
    }

    Ok(UniverseValidationResult {
        symbols: valid,
        skipped,
    })
}
