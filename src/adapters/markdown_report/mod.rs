//! Markdown report adapter.
//!
//! Watchlist and backtest reports are plain Markdown with inline SVG charts,
//! so they render in any Markdown viewer and diff cleanly between runs.

pub mod chart_svg;
pub mod tables;

use crate::domain::error::PlaybookError;
use crate::domain::watchlist::{bucket_by_risk, group_by_strategy, summary};
use crate::domain::watchlist::{LOW_RISK_MAX, MEDIUM_RISK_MAX};
use crate::ports::report_port::{BacktestContext, ReportPort, WatchlistContext};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default)]
pub struct MarkdownReportAdapter;

impl MarkdownReportAdapter {
    pub fn new() -> Self {
        MarkdownReportAdapter
    }

    pub fn render_watchlist(&self, ctx: &WatchlistContext<'_>) -> String {
        let scan = ctx.scan;
        let stats = summary(&scan.signals);
        let mut out = String::new();

        out.push_str(&format!("# Daily Watchlist: {}\n\n", ctx.date));
        out.push_str(&format!("Universe: **{}**\n\n", ctx.universe));
        out.push_str(&format!("Strategies: {}\n\n", ctx.strategies.join(", ")));

        out.push_str("## Summary\n\n");
        out.push_str(&format!("- Signals: {}\n", stats.total_signals));
        out.push_str(&format!("- Unique symbols: {}\n", stats.unique_symbols));
        out.push_str(&format!(
            "- Average risk/share: {}\n",
            stats
                .avg_risk
                .map_or_else(|| "-".to_string(), |r| format!("${:.2}", r))
        ));
        out.push_str(&format!("- Symbols scanned: {}\n", scan.symbols_scanned));
        out.push_str(&format!("- Symbols skipped: {}\n\n", scan.skipped.len()));

        out.push_str("## All Signals\n\n");
        let all: Vec<_> = scan.signals.iter().collect();
        out.push_str(&tables::format_signals_table(&all));

        out.push_str("\n## By Strategy\n");
        for (id, signals) in group_by_strategy(&scan.signals) {
            let name = signals.first().map_or(id, |s| s.strategy.as_str());
            out.push_str(&format!("\n### {} ({})\n\n", name, signals.len()));
            out.push_str(&tables::format_signals_table(&signals));
        }

        out.push_str("\n## By Risk\n");
        let buckets = bucket_by_risk(&scan.signals);
        for (title, bucket) in [
            (format!("Low (< ${:.0})", LOW_RISK_MAX), &buckets.low),
            (
                format!("Medium (${:.0} to ${:.0})", LOW_RISK_MAX, MEDIUM_RISK_MAX),
                &buckets.medium,
            ),
            (format!("High (>= ${:.0})", MEDIUM_RISK_MAX), &buckets.high),
        ] {
            out.push_str(&format!("\n### {} ({})\n\n", title, bucket.len()));
            out.push_str(&tables::format_signals_table(bucket));
        }

        if !scan.skipped.is_empty() {
            out.push_str("\n## Skipped Symbols\n\n");
            for skipped in &scan.skipped {
                out.push_str(&format!("- {}: {}\n", skipped.symbol, skipped.reason));
            }
        }
        if !scan.failures.is_empty() {
            out.push_str("\n## Playbook Errors\n\n");
            for failure in &scan.failures {
                out.push_str(&format!(
                    "- {} / {}: {}\n",
                    failure.symbol, failure.strategy_id, failure.reason
                ));
            }
        }
        out
    }

    pub fn render_backtest(&self, ctx: &BacktestContext<'_>) -> String {
        let portfolio = &ctx.result.portfolio;
        let mut out = String::new();

        out.push_str(&format!("# Backtest: {}\n\n", ctx.strategy_name));

        out.push_str("## Summary\n\n");
        out.push_str(&format!(
            "- Period: {} to {}\n",
            ctx.config.start_date, ctx.config.end_date
        ));
        out.push_str(&format!("- Symbols: {}\n", ctx.result.symbols.join(", ")));
        out.push_str(&format!("- Initial capital: {:.2}\n", portfolio.initial_capital));
        out.push_str(&format!("- Final equity: {:.2}\n", portfolio.final_equity()));
        out.push_str(&format!(
            "- Total return: {}\n",
            tables::format_pct(ctx.metrics.total_return)
        ));
        out.push_str(&format!("- Trading days: {}\n", ctx.result.dates_processed));
        out.push_str(&format!(
            "- Signals: {} ({} not taken)\n\n",
            ctx.result.total_signals, ctx.result.skipped_entries
        ));

        out.push_str("## Parameters\n\n");
        out.push_str(&tables::format_parameters(ctx.parameters));
        out.push_str(&format!(
            "\nCommission {:.2} + {:.3}%, slippage {:.3}%, max positions {}.\n\n",
            ctx.config.commission_per_trade,
            ctx.config.commission_pct,
            ctx.config.slippage_pct,
            ctx.config.max_positions
        ));

        out.push_str("## Performance\n\n");
        out.push_str(&tables::format_metrics_table(ctx.metrics));

        out.push_str("\n## Equity Curve\n\n");
        out.push_str(&chart_svg::equity_chart(&portfolio.equity_curve));
        out.push_str("\n## Drawdown\n\n");
        out.push_str(&chart_svg::drawdown_chart(&portfolio.equity_curve));

        out.push_str("\n## Monthly Returns\n\n");
        out.push_str(&tables::format_monthly_returns(
            &tables::compute_monthly_returns(&portfolio.equity_curve),
        ));

        out.push_str("\n## Per-Symbol Results\n\n");
        out.push_str(&tables::format_symbol_results(ctx.symbol_results));

        out.push_str("\n## Trade Log\n\n");
        out.push_str(&tables::format_trade_log(&portfolio.closed_trades));
        out
    }
}

fn write_report(output_path: &Path, content: &str) -> Result<(), PlaybookError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, content)?;
    info!(path = %output_path.display(), bytes = content.len(), "wrote report");
    Ok(())
}

impl ReportPort for MarkdownReportAdapter {
    fn write_watchlist(
        &self,
        ctx: &WatchlistContext<'_>,
        output_path: &Path,
    ) -> Result<(), PlaybookError> {
        write_report(output_path, &self.render_watchlist(ctx))
    }

    fn write_backtest(
        &self,
        ctx: &BacktestContext<'_>,
        output_path: &Path,
    ) -> Result<(), PlaybookError> {
        write_report(output_path, &self.render_backtest(ctx))
    }
}
