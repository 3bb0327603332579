//! Trade journal: live trades taken from signals, for comparison with backtests.

use crate::domain::error::PlaybookError;
use crate::domain::metrics::TradeStats;
use crate::domain::registry;
use crate::domain::signal::Direction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: u64,
    pub strategy_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_price: f64,
    pub shares: i64,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub notes: String,
}

impl JournalEntry {
    pub fn is_open(&self) -> bool {
        self.exit_date.is_none()
    }

    pub fn risk_per_share(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }

    /// Realised PnL; `None` while open.
    pub fn pnl(&self) -> Option<f64> {
        let exit = self.exit_price?;
        Some(self.direction.sign() as f64 * self.shares as f64 * (exit - self.entry_price))
    }

    /// PnL per share over initial risk per share.
    pub fn r_multiple(&self) -> Option<f64> {
        let risk = self.risk_per_share();
        if risk <= 0.0 || self.shares <= 0 {
            return None;
        }
        Some(self.pnl()? / self.shares as f64 / risk)
    }

    pub fn holding_days(&self) -> Option<i64> {
        self.exit_date.map(|d| (d - self.entry_date).num_days())
    }
}

/// A trade being opened. The journal assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub strategy_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_price: f64,
    pub shares: i64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyJournalStats {
    pub strategy_id: String,
    pub open_trades: usize,
    pub closed: TradeStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

fn journal_error(reason: impl Into<String>) -> PlaybookError {
    PlaybookError::Journal {
        reason: reason.into(),
    }
}

impl Journal {
    pub fn new(mut entries: Vec<JournalEntry>) -> Self {
        entries.sort_by_key(|e| e.id);
        Journal { entries }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<JournalEntry> {
        self.entries
    }

    pub fn get(&self, id: u64) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn next_id(&self) -> u64 {
        self.entries.iter().map(|e| e.id).max().map_or(1, |max| max + 1)
    }

    pub fn open_entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(|e| e.is_open())
    }

    pub fn closed_entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(|e| !e.is_open())
    }

    /// Record a new open trade and return its id.
    pub fn add(&mut self, trade: NewTrade) -> Result<u64, PlaybookError> {
        if !registry::is_known(&trade.strategy_id) {
            return Err(PlaybookError::UnknownStrategy {
                id: trade.strategy_id,
            });
        }
        if trade.shares <= 0 {
            return Err(journal_error("shares must be positive"));
        }
        if !(trade.entry_price > 0.0 && trade.stop_price > 0.0) {
            return Err(journal_error("entry and stop prices must be positive"));
        }
        if trade.symbol.trim().is_empty() {
            return Err(journal_error("symbol is empty"));
        }

        let id = self.next_id();
        self.entries.push(JournalEntry {
            id,
            strategy_id: trade.strategy_id,
            symbol: trade.symbol.trim().to_uppercase(),
            direction: trade.direction,
            entry_date: trade.entry_date,
            entry_price: trade.entry_price,
            stop_price: trade.stop_price,
            shares: trade.shares,
            exit_date: None,
            exit_price: None,
            notes: trade.notes,
        });
        Ok(id)
    }

    pub fn close(
        &mut self,
        id: u64,
        exit_date: NaiveDate,
        exit_price: f64,
    ) -> Result<&JournalEntry, PlaybookError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| journal_error(format!("no trade with id {}", id)))?;

        if !entry.is_open() {
            return Err(journal_error(format!("trade {} is already closed", id)));
        }
        if exit_date < entry.entry_date {
            return Err(journal_error(format!(
                "exit date {} is before entry date {}",
                exit_date, entry.entry_date
            )));
        }
        if exit_price <= 0.0 {
            return Err(journal_error("exit price must be positive"));
        }

        entry.exit_date = Some(exit_date);
        entry.exit_price = Some(exit_price);
        Ok(entry)
    }

    /// Closed-trade statistics for one strategy.
    pub fn stats_for(&self, strategy_id: &str) -> TradeStats {
        TradeStats::from_outcomes(
            self.closed_entries()
                .filter(|e| e.strategy_id == strategy_id)
                .filter_map(|e| Some((e.pnl()?, e.r_multiple()))),
        )
    }

    /// One row per strategy that has journal entries, sorted by id.
    pub fn summarize_by_strategy(&self) -> Vec<StrategyJournalStats> {
        let mut by_strategy: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &self.entries {
            let open = by_strategy.entry(entry.strategy_id.as_str()).or_default();
            if entry.is_open() {
                *open += 1;
            }
        }
        by_strategy
            .into_iter()
            .map(|(id, open_trades)| StrategyJournalStats {
                strategy_id: id.to_string(),
                open_trades,
                closed: self.stats_for(id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn trade(strategy: &str, direction: Direction, entry: f64, stop: f64) -> NewTrade {
        NewTrade {
            strategy_id: strategy.into(),
            symbol: "aapl".into(),
            direction,
            entry_date: date(3, 1),
            entry_price: entry,
            stop_price: stop,
            shares: 100,
            notes: String::new(),
        }
    }

    #[test]
    fn ids_are_sequential() {
        let mut journal = Journal::default();
        assert_eq!(journal.next_id(), 1);
        let a = journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        let b = journal.add(trade("ma101_burns", Direction::Long, 50.0, 45.0)).unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(journal.get(1).unwrap().symbol, "AAPL");
        assert_eq!(journal.open_entries().count(), 2);
    }

    #[test]
    fn pnl_sign_follows_direction() {
        let mut journal = Journal::default();
        let long = journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        let short = journal
            .add(trade("donchian_breakout", Direction::Short, 100.0, 105.0))
            .unwrap();

        journal.close(long, date(3, 11), 110.0).unwrap();
        journal.close(short, date(3, 11), 110.0).unwrap();

        let long = journal.get(long).unwrap();
        assert_eq!(long.pnl(), Some(1000.0));
        assert_eq!(long.r_multiple(), Some(2.0));
        assert_eq!(long.holding_days(), Some(10));

        let short = journal.get(short).unwrap();
        assert_eq!(short.pnl(), Some(-1000.0));
        assert_eq!(short.r_multiple(), Some(-2.0));
    }

    #[test]
    fn open_entry_has_no_pnl() {
        let mut journal = Journal::default();
        let id = journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        let entry = journal.get(id).unwrap();
        assert!(entry.is_open());
        assert_eq!(entry.pnl(), None);
        assert_eq!(entry.r_multiple(), None);
        assert_eq!(entry.holding_days(), None);
    }

    #[test]
    fn double_close_errors() {
        let mut journal = Journal::default();
        let id = journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        journal.close(id, date(3, 5), 101.0).unwrap();
        assert!(matches!(
            journal.close(id, date(3, 6), 102.0),
            Err(PlaybookError::Journal { .. })
        ));
        assert_eq!(journal.get(id).unwrap().exit_price, Some(101.0));
    }

    #[test]
    fn close_rejects_unknown_id_and_early_exit() {
        let mut journal = Journal::default();
        let id = journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        assert!(journal.close(99, date(3, 5), 101.0).is_err());
        assert!(journal.close(id, date(2, 28), 101.0).is_err());
        assert!(journal.get(id).unwrap().is_open());
    }

    #[test]
    fn add_validates_input() {
        let mut journal = Journal::default();
        assert!(matches!(
            journal.add(trade("turtle", Direction::Long, 100.0, 95.0)),
            Err(PlaybookError::UnknownStrategy { .. })
        ));
        let mut zero = trade("ma101_burns", Direction::Long, 100.0, 95.0);
        zero.shares = 0;
        assert!(journal.add(zero).is_err());
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn summarize_by_strategy_counts_open_and_closed() {
        let mut journal = Journal::default();
        let a = journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        let b = journal.add(trade("ma101_burns", Direction::Long, 100.0, 90.0)).unwrap();
        journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        journal.add(trade("qullamaggie_htf", Direction::Long, 20.0, 19.0)).unwrap();

        journal.close(a, date(3, 4), 110.0).unwrap();
        journal.close(b, date(3, 4), 95.0).unwrap();

        let summary = journal.summarize_by_strategy();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].strategy_id, "ma101_burns");
        assert_eq!(summary[0].open_trades, 1);
        assert_eq!(summary[0].closed.trades, 2);
        assert!((summary[0].closed.win_rate - 0.5).abs() < 1e-9);
        // R: +2.0 and -0.5
        assert!((summary[0].closed.avg_r_multiple.unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(summary[1].strategy_id, "qullamaggie_htf");
        assert_eq!(summary[1].closed.trades, 0);
    }

    #[test]
    fn new_sorts_by_id() {
        let mut journal = Journal::default();
        journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        journal.add(trade("ma101_burns", Direction::Long, 100.0, 95.0)).unwrap();
        let mut entries = journal.into_entries();
        entries.reverse();
        let journal = Journal::new(entries);
        assert_eq!(journal.entries()[0].id, 1);
        assert_eq!(journal.next_id(), 3);
    }
}
