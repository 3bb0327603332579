//! Backtest engine and event loop.
//!
//! Signals are generated over each symbol's full history so indicators are
//! warm by `start_date`; trading only happens on timeline dates inside the
//! configured range. Each date runs exits, then entries, then marks equity
//! at the close.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

use super::config_validation::{parse_date, validate_backtest_config};
use super::error::PlaybookError;
use super::execution::{EntryOrder, EntryResult, ExecutionConfig, enter_position, exit_position};
use super::playbook::Playbook;
use super::portfolio::Portfolio;
use super::position::ExitReason;
use super::signal::{Direction, SignalFrame};
use super::sizing::RiskConfig;
use super::symbol_data::{SymbolData, build_unified_timeline};
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub max_positions: usize,
    /// Close positions held this many calendar days; 0 disables.
    pub max_hold_days: i64,
    pub risk_free_rate: f64,
    pub allow_shorting: bool,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            initial_capital: 100_000.0,
            commission_per_trade: 0.0,
            commission_pct: 0.1,
            slippage_pct: 0.0,
            max_positions: 5,
            max_hold_days: 0,
            risk_free_rate: 0.05,
            allow_shorting: false,
        }
    }

    /// Read and validate the `[backtest]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PlaybookError> {
        validate_backtest_config(config)?;
        let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
        let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;
        let d = BacktestConfig::new(start_date, end_date);

        Ok(BacktestConfig {
            initial_capital: config.get_double("backtest", "initial_capital", d.initial_capital),
            commission_per_trade: config.get_double(
                "backtest",
                "commission_per_trade",
                d.commission_per_trade,
            ),
            commission_pct: config.get_double("backtest", "commission_pct", d.commission_pct),
            slippage_pct: config.get_double("backtest", "slippage_pct", d.slippage_pct),
            max_positions: config.get_int("backtest", "max_positions", d.max_positions as i64)
                as usize,
            max_hold_days: config.get_int("backtest", "max_hold_days", d.max_hold_days),
            risk_free_rate: config.get_double("backtest", "risk_free_rate", d.risk_free_rate),
            allow_shorting: config.get_bool("backtest", "allow_shorting", d.allow_shorting),
            ..d
        })
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_per_trade: self.commission_per_trade,
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
            allow_shorting: self.allow_shorting,
        }
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_id: String,
    pub portfolio: Portfolio,
    pub symbols: Vec<String>,
    pub dates_processed: usize,
    /// Signal events that fell inside the date range.
    pub total_signals: usize,
    /// Signals not taken: position cap, shorting disabled, zero size or cash.
    pub skipped_entries: usize,
}

/// Run `playbook` over `data` and return the final portfolio.
pub fn run_backtest(
    data: &[SymbolData],
    playbook: &dyn Playbook,
    config: &BacktestConfig,
    risk: &RiskConfig,
) -> Result<BacktestResult, PlaybookError> {
    let mut sorted: Vec<&SymbolData> = data.iter().collect();
    sorted.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let frames: Vec<SignalFrame<'_>> = sorted
        .iter()
        .map(|sd| playbook.generate_signals(&sd.bars))
        .collect::<Result<_, _>>()?;
    let symbol_index: HashMap<&str, usize> = sorted
        .iter()
        .enumerate()
        .map(|(i, sd)| (sd.symbol.as_str(), i))
        .collect();

    let timeline: Vec<NaiveDate> = build_unified_timeline(data)
        .into_iter()
        .filter(|d| config.in_range(*d))
        .collect();

    info!(
        strategy = playbook.id(),
        symbols = sorted.len(),
        dates = timeline.len(),
        start = %config.start_date,
        end = %config.end_date,
        "running backtest"
    );

    let exec = config.execution_config();
    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut last_close: HashMap<String, f64> = HashMap::new();
    let mut total_signals = 0usize;
    let mut skipped_entries = 0usize;

    for &date in &timeline {
        for sd in &sorted {
            if let Some(bar) = sd.get_bar(date) {
                last_close.insert(sd.symbol.clone(), bar.close);
            }
        }

        // Exits: stop, then playbook rule at close, then time stop at close.
        for symbol in portfolio.open_symbols() {
            let Some(&k) = symbol_index.get(symbol.as_str()) else {
                continue;
            };
            let Some(i) = sorted[k].get_bar_index(date) else {
                continue;
            };
            let Some(position) = portfolio.get_position(&symbol) else {
                continue;
            };
            let bar = &sorted[k].bars[i];

            let exit = if let Some(fill) = position.stop_fill(bar.open, bar.high, bar.low) {
                Some((fill, ExitReason::StopLoss))
            } else if let Some(reason) = playbook.check_exit(&frames[k], i, position) {
                Some((bar.close, ExitReason::Rule(reason)))
            } else if config.max_hold_days > 0
                && (date - position.entry_date).num_days() >= config.max_hold_days
            {
                Some((bar.close, ExitReason::TimeStop))
            } else {
                None
            };

            if let Some((price, reason)) = exit {
                debug!(symbol = %symbol, %date, price, reason = %reason, "exit");
                exit_position(&mut portfolio, &symbol, price, date, reason, &exec);
            }
        }

        // Entries in symbol order.
        for (k, sd) in sorted.iter().enumerate() {
            let Some(i) = sd.get_bar_index(date) else {
                continue;
            };
            let Some(event) = frames[k].event(i) else {
                continue;
            };
            total_signals += 1;

            if portfolio.has_position(&sd.symbol) {
                continue;
            }
            if portfolio.position_count() >= config.max_positions
                || (event.direction == Direction::Short && !config.allow_shorting)
            {
                skipped_entries += 1;
                continue;
            }

            let equity = portfolio.total_equity(&last_close);
            let shares = playbook.position_size(event.entry_price, event.stop_price, equity, risk);
            if shares <= 0 {
                skipped_entries += 1;
                continue;
            }

            let order = EntryOrder {
                symbol: sd.symbol.clone(),
                quantity: shares * event.direction.sign(),
                market_price: event.entry_price,
                stop_loss: event.stop_price,
                date,
                entry_type: event.entry_type.clone(),
            };
            match enter_position(&mut portfolio, order, &exec) {
                EntryResult::Entered {
                    quantity,
                    execution_price,
                    ..
                } => {
                    debug!(symbol = %sd.symbol, %date, quantity, price = execution_price, reason = %event.reason, "entry");
                }
                rejected => {
                    debug!(symbol = %sd.symbol, %date, ?rejected, "entry rejected");
                    skipped_entries += 1;
                }
            }
        }

        let equity = portfolio.total_equity(&last_close);
        portfolio.record_equity(date, equity);
    }

    if let Some(&last_date) = timeline.last() {
        let open = portfolio.open_symbols();
        for symbol in &open {
            let price = last_close.get(symbol).copied().unwrap_or(0.0);
            exit_position(&mut portfolio, symbol, price, last_date, ExitReason::EndOfData, &exec);
        }
        if !open.is_empty() {
            let cash = portfolio.cash;
            if let Some(point) = portfolio.equity_curve.last_mut() {
                point.equity = cash;
            }
        }
    }

    info!(
        strategy = playbook.id(),
        trades = portfolio.closed_trades.len(),
        final_equity = portfolio.final_equity(),
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy_id: playbook.id().to_string(),
        symbols: sorted.iter().map(|sd| sd.symbol.clone()).collect(),
        dates_processed: timeline.len(),
        total_signals,
        skipped_entries,
        portfolio,
    })
}
