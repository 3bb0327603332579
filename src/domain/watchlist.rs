//! Daily watchlist: scan a universe for signals on the latest bar.

use crate::domain::error::PlaybookError;
use crate::domain::playbook::Playbook;
use crate::domain::signal::Signal;
use crate::domain::sizing::RiskConfig;
use crate::domain::universe::{SkipReason, SkippedSymbol};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ScanFilter {
    pub min_bars: usize,
    pub min_risk: f64,
    pub max_risk: f64,
}

impl Default for ScanFilter {
    fn default() -> Self {
        ScanFilter {
            min_bars: 200,
            min_risk: 0.0,
            max_risk: 100.0,
        }
    }
}

impl ScanFilter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PlaybookError> {
        let d = ScanFilter::default();
        let min_bars = config.get_int("scan", "min_bars", d.min_bars as i64);
        if min_bars < 1 {
            return Err(PlaybookError::invalid("scan", "min_bars", "must be at least 1"));
        }
        let filter = ScanFilter {
            min_bars: min_bars as usize,
            min_risk: config.get_double("scan", "min_risk", d.min_risk),
            max_risk: config.get_double("scan", "max_risk", d.max_risk),
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<(), PlaybookError> {
        if self.min_risk < 0.0 {
            return Err(PlaybookError::invalid("scan", "min_risk", "must be non-negative"));
        }
        if self.min_risk > self.max_risk {
            return Err(PlaybookError::invalid(
                "scan",
                "min_risk",
                format!(
                    "min_risk ({}) exceeds max_risk ({})",
                    self.min_risk, self.max_risk
                ),
            ));
        }
        Ok(())
    }

    pub fn accepts(&self, signal: &Signal) -> bool {
        signal.risk_per_share >= self.min_risk && signal.risk_per_share <= self.max_risk
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybookFailure {
    pub symbol: String,
    pub strategy_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub signals: Vec<Signal>,
    pub symbols_scanned: usize,
    pub skipped: Vec<SkippedSymbol>,
    pub failures: Vec<PlaybookFailure>,
}

/// Run every playbook's current-signal check over `symbols`.
///
/// Symbols that fail to load or have fewer than `filter.min_bars` bars are
/// skipped. A playbook error on one symbol is recorded and the scan goes on.
pub fn scan(
    data_port: &dyn DataPort,
    symbols: &[String],
    playbooks: &[Box<dyn Playbook>],
    filter: &ScanFilter,
    account_equity: f64,
    risk: &RiskConfig,
) -> ScanResult {
    let mut result = ScanResult::default();

    for symbol in symbols {
        let bars = match data_port.fetch_all(symbol) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                let reason = match e {
                    PlaybookError::NoData { .. } => SkipReason::NoData,
                    other => SkipReason::LoadFailed(other.to_string()),
                };
                result.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason,
                });
                continue;
            }
        };

        if bars.len() < filter.min_bars {
            warn!(
                symbol = %symbol,
                bars = bars.len(),
                minimum = filter.min_bars,
                "skipping symbol with insufficient history"
            );
            result.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::InsufficientBars {
                    bars: bars.len(),
                    minimum: filter.min_bars,
                },
            });
            continue;
        }
        result.symbols_scanned += 1;

        for playbook in playbooks {
            let signal = match playbook.check_current_signal(&bars) {
                Ok(Some(signal)) => signal,
                Ok(None) => continue,
                Err(e) => {
                    warn!(symbol = %symbol, strategy = playbook.id(), error = %e, "playbook failed");
                    result.failures.push(PlaybookFailure {
                        symbol: symbol.clone(),
                        strategy_id: playbook.id().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !filter.accepts(&signal) {
                debug!(
                    symbol = %symbol,
                    strategy = playbook.id(),
                    risk = signal.risk_per_share,
                    "signal outside risk filter"
                );
                continue;
            }

            let shares = playbook.position_size(
                signal.entry_price,
                signal.stop_price,
                account_equity,
                risk,
            );
            result.signals.push(Signal { shares, ..signal });
        }
    }

    info!(
        scanned = result.symbols_scanned,
        skipped = result.skipped.len(),
        signals = result.signals.len(),
        "scan complete"
    );
    result
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistSummary {
    pub total_signals: usize,
    pub unique_symbols: usize,
    pub avg_risk: Option<f64>,
}

pub fn summary(signals: &[Signal]) -> WatchlistSummary {
    let unique: HashSet<&str> = signals.iter().map(|s| s.symbol.as_str()).collect();
    let avg_risk = (!signals.is_empty()).then(|| {
        signals.iter().map(|s| s.risk_per_share).sum::<f64>() / signals.len() as f64
    });
    WatchlistSummary {
        total_signals: signals.len(),
        unique_symbols: unique.len(),
        avg_risk,
    }
}

/// Signals keyed by strategy id. Each group's display name is on its signals.
pub fn group_by_strategy(signals: &[Signal]) -> BTreeMap<&str, Vec<&Signal>> {
    let mut groups: BTreeMap<&str, Vec<&Signal>> = BTreeMap::new();
    for signal in signals {
        groups
            .entry(signal.strategy_id.as_str())
            .or_default()
            .push(signal);
    }
    groups
}

pub const LOW_RISK_MAX: f64 = 1.0;
pub const MEDIUM_RISK_MAX: f64 = 3.0;

/// Signals split by dollar risk per share, each bucket sorted ascending.
#[derive(Debug, Default)]
pub struct RiskBuckets<'a> {
    /// risk < $1
    pub low: Vec<&'a Signal>,
    /// $1 <= risk < $3
    pub medium: Vec<&'a Signal>,
    /// risk >= $3
    pub high: Vec<&'a Signal>,
}

pub fn bucket_by_risk(signals: &[Signal]) -> RiskBuckets<'_> {
    let mut buckets = RiskBuckets::default();
    for signal in signals {
        let risk = signal.risk_per_share;
        if risk < LOW_RISK_MAX {
            buckets.low.push(signal);
        } else if risk < MEDIUM_RISK_MAX {
            buckets.medium.push(signal);
        } else {
            buckets.high.push(signal);
        }
    }
    for bucket in [&mut buckets.low, &mut buckets.medium, &mut buckets.high] {
        bucket.sort_by(|a, b| a.risk_per_share.total_cmp(&b.risk_per_share));
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Direction;
    use chrono::NaiveDate;

    fn signal(symbol: &str, strategy: &str, risk: f64) -> Signal {
        Signal {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            symbol: symbol.into(),
            strategy_id: strategy.to_lowercase(),
            strategy: strategy.into(),
            direction: Direction::Long,
            entry_price: 100.0,
            stop_price: 100.0 - risk,
            risk_per_share: risk,
            shares: 0,
            reason: "test".into(),
            entry_type: None,
            atr: None,
            rsi: None,
            volume_ratio: None,
            dollar_volume: None,
            pole_move_pct: None,
        }
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let filter = ScanFilter {
            min_bars: 1,
            min_risk: 1.0,
            max_risk: 2.0,
        };
        assert!(filter.accepts(&signal("A", "X", 1.0)));
        assert!(filter.accepts(&signal("A", "X", 2.0)));
        assert!(!filter.accepts(&signal("A", "X", 0.99)));
        assert!(!filter.accepts(&signal("A", "X", 2.01)));
    }

    #[test]
    fn filter_rejects_inverted_range() {
        let filter = ScanFilter {
            min_bars: 1,
            min_risk: 5.0,
            max_risk: 2.0,
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn summary_counts() {
        let signals = vec![
            signal("AAPL", "A", 1.0),
            signal("AAPL", "B", 3.0),
            signal("MSFT", "A", 2.0),
        ];
        let s = summary(&signals);
        assert_eq!(s.total_signals, 3);
        assert_eq!(s.unique_symbols, 2);
        assert_eq!(s.avg_risk, Some(2.0));
        assert_eq!(summary(&[]).avg_risk, None);
    }

    #[test]
    fn groups_by_strategy_id() {
        let mut renamed = signal("TSLA", "Zeta", 1.5);
        renamed.strategy = "Zeta (renamed)".into();
        let signals = vec![
            signal("AAPL", "Zeta", 1.0),
            signal("MSFT", "Alpha", 2.0),
            signal("NVDA", "Zeta", 0.5),
            renamed,
        ];
        let groups = group_by_strategy(&signals);
        let keys: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
        assert_eq!(groups["zeta"].len(), 3);
        assert_eq!(groups["alpha"][0].strategy, "Alpha");
    }

    #[test]
    fn risk_buckets_partition_and_sort() {
        let signals = vec![
            signal("A", "X", 2.5),
            signal("B", "X", 0.4),
            signal("C", "X", 3.0),
            signal("D", "X", 1.0),
            signal("E", "X", 0.9),
            signal("F", "X", 7.0),
        ];
        let buckets = bucket_by_risk(&signals);
        let names = |b: &Vec<&Signal>| b.iter().map(|s| s.symbol.clone()).collect::<Vec<_>>();
        assert_eq!(names(&buckets.low), vec!["B", "E"]);
        assert_eq!(names(&buckets.medium), vec!["D", "A"]);
        assert_eq!(names(&buckets.high), vec!["C", "F"]);
        assert_eq!(
            buckets.low.len() + buckets.medium.len() + buckets.high.len(),
            signals.len()
        );
    }
}
