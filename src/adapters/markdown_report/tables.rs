//! Markdown tables for the watchlist and backtest reports.

use crate::domain::metrics::{Metrics, SymbolResult};
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::ClosedTrade;
use crate::domain::signal::Signal;
use chrono::Datelike;
use std::collections::BTreeMap;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub struct MonthlyReturns {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

pub fn format_pct(value: f64) -> String {
    format!("{:+.1}%", value * 100.0)
}

fn format_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", precision, v))
}

fn header(columns: &[&str]) -> String {
    let mut out = format!("| {} |\n", columns.join(" | "));
    out.push('|');
    for _ in columns {
        out.push_str(" --- |");
    }
    out.push('\n');
    out
}

fn row(cells: &[String]) -> String {
    format!("| {} |\n", cells.join(" | "))
}

pub fn format_signals_table(signals: &[&Signal]) -> String {
    if signals.is_empty() {
        return "_No signals._\n".to_string();
    }
    let mut out = header(&[
        "Symbol", "Strategy", "Dir", "Entry", "Stop", "Risk/Share", "Shares", "Reason",
    ]);
    for s in signals {
        out.push_str(&row(&[
            s.symbol.clone(),
            s.strategy.clone(),
            s.direction.to_string(),
            format!("{:.2}", s.entry_price),
            format!("{:.2}", s.stop_price),
            format!("{:.2}", s.risk_per_share),
            s.shares.to_string(),
            s.reason.clone(),
        ]));
    }
    out
}

pub fn format_parameters(parameters: &[(String, String)]) -> String {
    if parameters.is_empty() {
        return "_Defaults._\n".to_string();
    }
    let mut out = header(&["Parameter", "Value"]);
    for (key, value) in parameters {
        out.push_str(&row(&[format!("`{}`", key), value.clone()]));
    }
    out
}

pub fn format_metrics_table(metrics: &Metrics) -> String {
    let rows = [
        ("Total Return", format_pct(metrics.total_return)),
        ("Annualized Return", format_pct(metrics.annualized_return)),
        ("Sharpe Ratio", format!("{:.3}", metrics.sharpe_ratio)),
        ("Sortino Ratio", format!("{:.3}", metrics.sortino_ratio)),
        ("Max Drawdown", format_pct(-metrics.max_drawdown)),
        (
            "Max Drawdown Duration",
            format!("{} bars", metrics.max_drawdown_duration),
        ),
        ("Total Trades", metrics.total_trades.to_string()),
        ("Win Rate", format!("{:.1}%", metrics.win_rate * 100.0)),
        ("Profit Factor", format!("{:.2}", metrics.profit_factor)),
        ("Average Win", format!("{:.2}", metrics.avg_win)),
        ("Average Loss", format!("{:.2}", metrics.avg_loss)),
        ("Largest Win", format!("{:.2}", metrics.largest_win)),
        ("Largest Loss", format!("{:.2}", metrics.largest_loss)),
        (
            "Avg Holding Period",
            format!("{:.1} days", metrics.avg_trade_duration),
        ),
        ("Avg R-Multiple", format_opt(metrics.avg_r_multiple, 2)),
    ];
    let mut out = header(&["Metric", "Value"]);
    for (name, value) in rows {
        out.push_str(&row(&[name.to_string(), value]));
    }
    out
}

/// Month-over-month returns from the equity at each month end. The first
/// month has no reference point and reports 0.
pub fn compute_monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturns> {
    let mut month_end: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for point in equity_curve {
        month_end.insert((point.date.year(), point.date.month()), point.equity);
    }

    let mut previous: Option<f64> = None;
    month_end
        .into_iter()
        .map(|((year, month), end)| {
            let return_pct = match previous {
                Some(prev) if prev != 0.0 => (end - prev) / prev,
                _ => 0.0,
            };
            previous = Some(end);
            MonthlyReturns {
                year,
                month,
                return_pct,
            }
        })
        .collect()
}

pub fn format_monthly_returns(returns: &[MonthlyReturns]) -> String {
    if returns.is_empty() {
        return "_No returns data._\n".to_string();
    }

    let mut by_year: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in returns {
        by_year.entry(r.year).or_insert([None; 12])[(r.month - 1) as usize] = Some(r.return_pct);
    }

    let mut columns = vec!["Year"];
    columns.extend(MONTH_NAMES);
    columns.push("YTD");
    let mut out = header(&columns);

    for (year, months) in by_year {
        let ytd = months.iter().flatten().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
        let mut cells = vec![year.to_string()];
        cells.extend(
            months
                .iter()
                .map(|m| m.map_or_else(String::new, format_pct)),
        );
        cells.push(format_pct(ytd));
        out.push_str(&row(&cells));
    }
    out
}

pub fn format_symbol_results(results: &[SymbolResult]) -> String {
    if results.is_empty() {
        return "_No per-symbol data available._\n".to_string();
    }
    let mut out = header(&[
        "Symbol",
        "Trades",
        "Win Rate",
        "Total PnL",
        "Largest Win",
        "Largest Loss",
        "Avg R",
    ]);
    for r in results {
        out.push_str(&row(&[
            r.symbol.clone(),
            r.total_trades.to_string(),
            format!("{:.1}%", r.win_rate * 100.0),
            format!("{:.2}", r.total_pnl),
            format!("{:.2}", r.largest_win),
            format!("{:.2}", r.largest_loss),
            format_opt(r.avg_r_multiple, 2),
        ]));
    }
    out
}

pub fn format_trade_log(trades: &[ClosedTrade]) -> String {
    if trades.is_empty() {
        return "_No trades executed._\n".to_string();
    }

    let mut sorted: Vec<&ClosedTrade> = trades.iter().collect();
    sorted.sort_by_key(|t| (t.entry_date, t.symbol.as_str()));

    let mut out = header(&[
        "#", "Symbol", "Dir", "Qty", "Entry Date", "Entry", "Exit Date", "Exit", "PnL", "R",
        "Exit Reason",
    ]);
    for (i, t) in sorted.iter().enumerate() {
        out.push_str(&row(&[
            (i + 1).to_string(),
            t.symbol.clone(),
            t.direction().to_string(),
            t.quantity.abs().to_string(),
            t.entry_date.to_string(),
            format!("{:.2}", t.entry_price),
            t.exit_date.to_string(),
            format!("{:.2}", t.exit_price),
            format!("{:.2}", t.pnl),
            format_opt(t.r_multiple, 2),
            t.exit_reason.to_string(),
        ]));
    }
    out
}
