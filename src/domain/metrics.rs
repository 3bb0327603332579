//! Performance metrics, per-symbol results and live-versus-backtest comparison.

use super::portfolio::{EquityPoint, Portfolio};
use super::position::ClosedTrade;
use std::collections::BTreeMap;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_trade_duration: f64,
    /// Mean R-multiple over trades that had a stop distance.
    pub avg_r_multiple: Option<f64>,
}

impl Metrics {
    pub fn compute(portfolio: &Portfolio, risk_free_rate: f64) -> Self {
        let equity_curve = &portfolio.equity_curve;
        let trades = &portfolio.closed_trades;
        let initial_capital = portfolio.initial_capital;

        let final_equity = portfolio.final_equity();

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let trading_days = equity_curve.len() as f64;
        let years = trading_days / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0
        {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, daily_rf);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_days = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            total_duration_days += trade.holding_days();
        }

        let total_trades = trades.len();
        let win_rate = ratio(trades_won as f64, total_trades);

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win: ratio(total_wins, trades_won),
            avg_loss: ratio(total_losses, trades_lost),
            largest_win,
            largest_loss,
            avg_trade_duration: ratio(total_duration_days as f64, total_trades),
            avg_r_multiple: mean(trades.iter().filter_map(|t| t.r_multiple)),
        }
    }
}

fn ratio(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { 0.0 }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Largest peak-to-trough fall as a fraction of the peak, and the longest run
/// of bars spent below a prior peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], daily_rf: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;
    let annualise = TRADING_DAYS_PER_YEAR.sqrt();

    let sharpe = if stddev > 0.0 {
        excess_return / stddev * annualise
    } else {
        0.0
    };

    let downside_variance: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        excess_return / downside_stddev * annualise
    } else {
        0.0
    };

    (sharpe, sortino)
}

/// Closed-trade results for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolResult {
    pub symbol: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_r_multiple: Option<f64>,
}

impl SymbolResult {
    /// One result per traded symbol, sorted by symbol.
    pub fn compute_per_symbol(trades: &[ClosedTrade]) -> Vec<SymbolResult> {
        let mut by_symbol: BTreeMap<&str, Vec<&ClosedTrade>> = BTreeMap::new();
        for trade in trades {
            by_symbol.entry(trade.symbol.as_str()).or_default().push(trade);
        }

        by_symbol
            .into_iter()
            .map(|(symbol, trades)| {
                let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
                let losing_trades = trades.iter().filter(|t| t.pnl < 0.0).count();
                SymbolResult {
                    symbol: symbol.to_string(),
                    total_trades: trades.len(),
                    winning_trades,
                    losing_trades,
                    total_pnl: trades.iter().map(|t| t.pnl).sum(),
                    win_rate: ratio(winning_trades as f64, trades.len()),
                    largest_win: trades.iter().map(|t| t.pnl).fold(0.0, f64::max),
                    largest_loss: trades.iter().map(|t| -t.pnl).fold(0.0, f64::max),
                    avg_r_multiple: mean(trades.iter().filter_map(|t| t.r_multiple)),
                }
            })
            .collect()
    }
}

/// Outcome statistics shared by backtests and the live journal.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub trades: usize,
    pub win_rate: f64,
    pub avg_r_multiple: Option<f64>,
    /// Mean PnL per trade.
    pub expectancy: f64,
    pub total_pnl: f64,
}

impl TradeStats {
    /// Build from `(pnl, r_multiple)` pairs.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = (f64, Option<f64>)>) -> Self {
        let outcomes: Vec<(f64, Option<f64>)> = outcomes.into_iter().collect();
        let trades = outcomes.len();
        let wins = outcomes.iter().filter(|(pnl, _)| *pnl > 0.0).count();
        let total_pnl: f64 = outcomes.iter().map(|(pnl, _)| pnl).sum();
        TradeStats {
            trades,
            win_rate: ratio(wins as f64, trades),
            avg_r_multiple: mean(outcomes.iter().filter_map(|(_, r)| *r)),
            expectancy: ratio(total_pnl, trades),
            total_pnl,
        }
    }

    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        Self::from_outcomes(trades.iter().map(|t| (t.pnl, t.r_multiple)))
    }
}

/// Live results measured against the backtest of the same playbook.
/// Deltas are live minus backtest.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceComparison {
    pub live: TradeStats,
    pub backtest: TradeStats,
    pub win_rate_delta: f64,
    pub avg_r_delta: Option<f64>,
    pub expectancy_delta: f64,
}

impl PerformanceComparison {
    pub fn compare(live: TradeStats, backtest: TradeStats) -> Self {
        let avg_r_delta = match (live.avg_r_multiple, backtest.avg_r_multiple) {
            (Some(l), Some(b)) => Some(l - b),
            _ => None,
        };
        PerformanceComparison {
            win_rate_delta: live.win_rate - backtest.win_rate,
            expectancy_delta: live.expectancy - backtest.expectancy,
            avg_r_delta,
            live,
            backtest,
        }
    }

    /// Live win rate within `tolerance` of the backtest's, and live average R
    /// not below the backtest's by more than `tolerance`.
    pub fn is_tracking(&self, tolerance: f64) -> bool {
        let r_ok = self.avg_r_delta.is_none_or(|d| d >= -tolerance);
        self.win_rate_delta.abs() <= tolerance && r_ok
    }
}
