//! CLI definition and dispatch.

use chrono::{Duration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::journal_csv_adapter::JournalCsvAdapter;
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::adapters::signal_csv_adapter::SignalCsvAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::config_validation::{
    validate_app_config, validate_backtest_config, validate_fetch,
};
use crate::domain::error::PlaybookError;
use crate::domain::journal::{Journal, NewTrade};
use crate::domain::metrics::{Metrics, PerformanceComparison, SymbolResult, TradeStats};
use crate::domain::playbook::Playbook;
use crate::domain::registry::{
    build_playbook, get_enabled_strategies, select_playbooks, strategy_registry,
};
use crate::domain::signal::{Direction, Signal};
use crate::domain::sizing::{RiskConfig, account_equity};
use crate::domain::symbol_data::SymbolData;
use crate::domain::universe::{
    SkippedSymbol, list_universes, parse_symbols, resolve_universe, validate_universe,
};
use crate::domain::watchlist::{ScanFilter, ScanResult, scan, summary};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::journal_port::JournalPort;
use crate::ports::quote_port::QuotePort;
use crate::ports::report_port::{BacktestContext, ReportPort, WatchlistContext};
use crate::ports::signal_sink::SignalSink;

pub const DEFAULT_CONFIG: &str = "playbook.ini";

#[derive(Parser, Debug)]
#[command(
    name = "playbook",
    about = "Daily signal engine for systematic trading playbooks"
)]
pub struct Cli {
    /// INI config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in playbooks with their parameters
    Strategies,
    /// Scan a universe for signals on the latest bar
    Scan(ScanArgs),
    /// Recent historical signals for one symbol and playbook
    Signals {
        symbol: String,
        strategy: String,
        #[arg(long, default_value_t = 10)]
        last: usize,
    },
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        strategy: String,
        #[arg(short, long, conflicts_with = "symbols")]
        universe: Option<String>,
        /// Comma-separated symbols instead of a universe
        #[arg(long)]
        symbols: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Download or update price history
    Fetch {
        #[arg(short, long, conflicts_with = "symbols")]
        universe: Option<String>,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Fetch, scan, then write the signals file and watchlist report
    Daily {
        #[arg(short, long)]
        universe: Option<String>,
        /// Scan stored data without downloading
        #[arg(long)]
        skip_fetch: bool,
    },
    /// Trade journal
    Journal {
        #[command(subcommand)]
        action: JournalCommand,
    },
    /// Show stored data range for symbol(s)
    Info { symbol: Option<String> },
    /// List symbols with stored price history
    ListSymbols,
    /// Validate the configuration and every enabled playbook
    Validate,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ScanArgs {
    #[arg(short, long)]
    pub universe: Option<String>,

    /// Playbook id; repeat for several. Defaults to every enabled playbook
    #[arg(short = 's', long = "strategy")]
    pub strategies: Vec<String>,

    #[arg(long)]
    pub min_risk: Option<f64>,

    #[arg(long)]
    pub max_risk: Option<f64>,

    /// Print the signals without writing the daily signals file
    #[arg(long)]
    pub no_write: bool,

    /// Also write a Markdown watchlist report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum JournalCommand {
    /// Record a trade taken from a signal
    Add {
        #[arg(long)]
        strategy: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "LONG")]
        direction: Direction,
        #[arg(long)]
        entry: f64,
        #[arg(long)]
        stop: f64,
        #[arg(long)]
        shares: i64,
        /// Entry date (YYYY-MM-DD), default today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Close an open trade
    Close {
        id: u64,
        #[arg(long)]
        price: f64,
        /// Exit date (YYYY-MM-DD), default today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List journal entries
    List {
        #[arg(long)]
        open: bool,
    },
    /// Closed-trade statistics per playbook
    Stats,
    /// Compare live results with a backtest of the same playbook
    Compare {
        #[arg(short, long)]
        strategy: String,
        #[arg(short, long, conflicts_with = "symbols")]
        universe: Option<String>,
        #[arg(long)]
        symbols: Option<String>,
        /// Largest win-rate gap (and average R shortfall) still counted as tracking
        #[arg(long, default_value_t = 0.10)]
        tolerance: f64,
    },
}

/// File locations from the `[data]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub historical_dir: PathBuf,
    pub signals_dir: PathBuf,
    pub journal_file: PathBuf,
    pub reports_dir: PathBuf,
}

impl DataPaths {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let path = |key: &str, default: &str| {
            PathBuf::from(
                config
                    .get_string("data", key)
                    .unwrap_or_else(|| default.to_string()),
            )
        };
        DataPaths {
            historical_dir: path("historical_dir", "data/historical"),
            signals_dir: path("signals_dir", "data/signals"),
            journal_file: path("journal_file", "data/trades/journal.csv"),
            reports_dir: path("reports_dir", "reports"),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let result = match cli.command {
        Command::Strategies => run_strategies(&config),
        Command::Scan(args) => run_scan(&config, &args),
        Command::Signals {
            symbol,
            strategy,
            last,
        } => run_signals(&config, &symbol, &strategy, last),
        Command::Backtest {
            strategy,
            universe,
            symbols,
            output,
            dry_run,
        } => run_backtest_command(
            &config,
            &strategy,
            universe.as_deref(),
            symbols.as_deref(),
            output.as_deref(),
            dry_run,
        ),
        Command::Fetch { universe, symbols } => {
            run_fetch(&config, universe.as_deref(), symbols.as_deref())
        }
        Command::Daily {
            universe,
            skip_fetch,
        } => run_daily(&config, universe.as_deref(), skip_fetch),
        Command::Journal { action } => run_journal(&config, action),
        Command::Info { symbol } => run_info(&config, symbol.as_deref()),
        Command::ListSymbols => run_list_symbols(&config),
        Command::Validate => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(err: &PlaybookError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Load the INI config. A missing file at the default path means built-in
/// defaults; any other missing path is an error.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, PlaybookError> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        warn!(path = %path.display(), "config file not found, using defaults");
        return FileConfigAdapter::from_string("");
    }
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Symbols from `--symbols`, else the named (or default) universe.
pub fn resolve_symbols(
    config: &dyn ConfigPort,
    universe: Option<&str>,
    symbols: Option<&str>,
) -> Result<Vec<String>, PlaybookError> {
    match symbols {
        Some(raw) => parse_symbols(raw)
            .map_err(|e| PlaybookError::invalid("command line", "symbols", e.to_string())),
        None => Ok(resolve_universe(config, universe)?.symbols),
    }
}

fn run_strategies(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    for strategy in strategy_registry(config)? {
        let playbook = build_playbook(strategy.id, config)?;
        let def = playbook.definition();
        let status = if strategy.enabled { "" } else { " (disabled)" };

        println!("{} [{}]{}", strategy.name, strategy.id, status);
        println!("  {}", strategy.description);
        println!(
            "  timeframe: {}, style: {}, assets: {}",
            def.meta.timeframe, def.meta.style, def.meta.asset_class
        );
        println!("  source: {}", def.meta.source);
        println!("  risk per trade: {:.2}%", def.risk_pct * 100.0);
        println!("  indicators: {}", def.required_indicators.join(", "));
        let params: Vec<String> = playbook
            .parameters()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("  parameters: {}", params.join(", "));
        if !def.parameters_to_optimize.is_empty() {
            println!("  tunable: {}", def.parameters_to_optimize.join(", "));
        }
        println!();
    }
    Ok(())
}

/// A finished scan plus what it ran over, for printing and reports.
#[derive(Debug)]
pub struct ScanOutput {
    pub universe: String,
    pub strategies: Vec<String>,
    pub result: ScanResult,
}

pub fn run_scan_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    args: &ScanArgs,
) -> Result<ScanOutput, PlaybookError> {
    let risk = RiskConfig::from_config(config)?;

    let mut filter = ScanFilter::from_config(config)?;
    if let Some(min_risk) = args.min_risk {
        filter.min_risk = min_risk;
    }
    if let Some(max_risk) = args.max_risk {
        filter.max_risk = max_risk;
    }
    filter.validate()?;

    let universe = resolve_universe(config, args.universe.as_deref())?;
    let playbooks = select_playbooks(&args.strategies, config)?;
    info!(
        universe = %universe.name,
        symbols = universe.count(),
        playbooks = playbooks.len(),
        "scanning"
    );

    let result = scan(
        data_port,
        &universe.symbols,
        &playbooks,
        &filter,
        account_equity(config),
        &risk,
    );
    Ok(ScanOutput {
        universe: universe.name,
        strategies: playbooks.iter().map(|p| p.id().to_string()).collect(),
        result,
    })
}

fn print_signals(signals: &[Signal]) {
    if signals.is_empty() {
        println!("No signals.");
        return;
    }
    println!(
        "{:<8} {:<30} {:<5} {:>10} {:>10} {:>8} {:>7}  REASON",
        "SYMBOL", "STRATEGY", "DIR", "ENTRY", "STOP", "RISK", "SHARES"
    );
    for s in signals {
        println!(
            "{:<8} {:<30} {:<5} {:>10.2} {:>10.2} {:>8.2} {:>7}  {}",
            s.symbol,
            s.strategy,
            s.direction,
            s.entry_price,
            s.stop_price,
            s.risk_per_share,
            s.shares,
            s.reason
        );
    }
    let stats = summary(signals);
    println!(
        "\n{} signals across {} symbols",
        stats.total_signals, stats.unique_symbols
    );
}

fn publish_scan(
    paths: &DataPaths,
    date: NaiveDate,
    output: &ScanOutput,
    write_signals: bool,
    report: Option<&Path>,
) -> Result<(), PlaybookError> {
    if write_signals {
        let sink = SignalCsvAdapter::new(&paths.signals_dir);
        let path = sink.write_signals(date, &output.result.signals)?;
        eprintln!("Signals written to: {}", path.display());
    }
    if let Some(report) = report {
        let ctx = WatchlistContext {
            date,
            universe: &output.universe,
            strategies: &output.strategies,
            scan: &output.result,
        };
        MarkdownReportAdapter::new().write_watchlist(&ctx, report)?;
        eprintln!("Report written to: {}", report.display());
    }
    Ok(())
}

fn run_scan(config: &dyn ConfigPort, args: &ScanArgs) -> Result<(), PlaybookError> {
    let paths = DataPaths::from_config(config);
    let data_port = CsvAdapter::new(&paths.historical_dir);

    let output = run_scan_pipeline(&data_port, config, args)?;
    print_signals(&output.result.signals);
    publish_scan(
        &paths,
        today(),
        &output,
        !args.no_write,
        args.report.as_deref(),
    )
}

fn run_signals(
    config: &dyn ConfigPort,
    symbol: &str,
    strategy: &str,
    last: usize,
) -> Result<(), PlaybookError> {
    let paths = DataPaths::from_config(config);
    let data_port = CsvAdapter::new(&paths.historical_dir);
    let playbook = build_playbook(strategy, config)?;

    let symbol = symbol.to_uppercase();
    let bars = data_port.fetch_all(&symbol)?;
    let frame = playbook.generate_signals(&bars)?;
    info!(
        symbol = %symbol,
        bars = bars.len(),
        signals = frame.signal_count(),
        "generated signals"
    );

    let recent = frame.recent_events(last);
    if recent.is_empty() {
        println!("No {} signals for {}.", playbook.name(), symbol);
        return Ok(());
    }
    println!(
        "{:<10} {:<5} {:>10} {:>10} {:>8}  REASON",
        "DATE", "DIR", "ENTRY", "STOP", "RISK"
    );
    for (bar, event) in recent {
        println!(
            "{:<10} {:<5} {:>10.2} {:>10.2} {:>8.2}  {}",
            bar.date,
            event.direction,
            event.entry_price,
            event.stop_price,
            event.risk_per_share(),
            event.reason
        );
    }
    Ok(())
}

#[derive(Debug)]
pub struct BacktestOutcome {
    pub result: BacktestResult,
    pub metrics: Metrics,
    pub symbol_results: Vec<SymbolResult>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Load every symbol with data in the range and run `playbook` over them.
///
/// Bars before `start_date` are loaded too so indicators are warm when
/// trading starts. Fails with `InsufficientData` when no symbol has bars in
/// the range.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    playbook: &dyn Playbook,
    bt_config: &BacktestConfig,
    risk: &RiskConfig,
    symbols: &[String],
) -> Result<BacktestOutcome, PlaybookError> {
    let validation = validate_universe(
        data_port,
        symbols,
        bt_config.start_date,
        bt_config.end_date,
        1,
    )?;

    let mut data = Vec::with_capacity(validation.symbols.len());
    for symbol in &validation.symbols {
        data.push(SymbolData::new(symbol.clone(), data_port.fetch_all(symbol)?));
    }
    info!(
        strategy = playbook.id(),
        symbols = data.len(),
        start = %bt_config.start_date,
        end = %bt_config.end_date,
        "running backtest"
    );
    let result = run_backtest(&data, playbook, bt_config, risk)?;
    let metrics = Metrics::compute(&result.portfolio, bt_config.risk_free_rate);
    let symbol_results = SymbolResult::compute_per_symbol(&result.portfolio.closed_trades);

    Ok(BacktestOutcome {
        result,
        metrics,
        symbol_results,
        skipped: validation.skipped,
    })
}

fn print_dry_run(
    playbook: &dyn Playbook,
    bt_config: &BacktestConfig,
    symbols: &[String],
) -> Result<(), PlaybookError> {
    println!("Playbook: {} [{}]", playbook.name(), playbook.id());
    for (key, value) in playbook.parameters() {
        println!("  {key} = {value}");
    }
    let indicators: Vec<String> = playbook
        .indicator_types()?
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("Indicators: {}", indicators.join(", "));
    println!(
        "Period: {} to {}",
        bt_config.start_date, bt_config.end_date
    );
    println!(
        "Capital: {:.2}, max positions: {}, commission: {:.2} + {:.3}%, slippage: {:.3}%",
        bt_config.initial_capital,
        bt_config.max_positions,
        bt_config.commission_per_trade,
        bt_config.commission_pct,
        bt_config.slippage_pct
    );
    println!("Symbols: {}", symbols.join(", "));
    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn print_backtest_summary(outcome: &BacktestOutcome) {
    let metrics = &outcome.metrics;
    println!("=== Aggregate Results ===");
    println!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    println!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    println!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    println!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    println!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    println!("Total Trades:     {}", metrics.total_trades);
    println!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", metrics.profit_factor);
    if let Some(r) = metrics.avg_r_multiple {
        println!("Average R:        {:.2}", r);
    }

    if !outcome.symbol_results.is_empty() {
        println!("\n=== Per-Symbol Summary ===");
        for sr in &outcome.symbol_results {
            println!(
                "  {}:  {} trades, {:.1}% win rate, {:+.0}",
                sr.symbol,
                sr.total_trades,
                sr.win_rate * 100.0,
                sr.total_pnl
            );
        }
    }
    for skipped in &outcome.skipped {
        eprintln!("skipped {}: {}", skipped.symbol, skipped.reason);
    }
}

fn run_backtest_command(
    config: &dyn ConfigPort,
    strategy: &str,
    universe: Option<&str>,
    symbols: Option<&str>,
    output: Option<&Path>,
    dry_run: bool,
) -> Result<(), PlaybookError> {
    let bt_config = BacktestConfig::from_config(config)?;
    let risk = RiskConfig::from_config(config)?;
    let playbook = build_playbook(strategy, config)?;
    let symbols = resolve_symbols(config, universe, symbols)?;

    if dry_run {
        return print_dry_run(playbook.as_ref(), &bt_config, &symbols);
    }

    let paths = DataPaths::from_config(config);
    let data_port = CsvAdapter::new(&paths.historical_dir);
    let outcome =
        run_backtest_pipeline(&data_port, playbook.as_ref(), &bt_config, &risk, &symbols)?;
    print_backtest_summary(&outcome);

    let output = output.map(Path::to_path_buf).unwrap_or_else(|| {
        paths.reports_dir.join(format!(
            "backtest_{}_{}_{}.md",
            playbook.id(),
            bt_config.start_date,
            bt_config.end_date
        ))
    });
    let parameters = playbook.parameters();
    let ctx = BacktestContext {
        strategy_name: playbook.name(),
        parameters: &parameters,
        config: &bt_config,
        result: &outcome.result,
        metrics: &outcome.metrics,
        symbol_results: &outcome.symbol_results,
    };
    MarkdownReportAdapter::new().write_backtest(&ctx, &output)?;
    eprintln!("\nReport written to: {}", output.display());
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
pub struct FetchSummary {
    /// Symbol and the number of dates new to its file.
    pub updated: Vec<(String, usize)>,
    pub failed: Vec<(String, String)>,
}

/// Download each symbol and merge it into the store.
///
/// A symbol with stored history is refreshed from its last stored date;
/// otherwise `lookback_days` of history is requested. One failed symbol does
/// not stop the rest, but every symbol failing is an error.
pub fn fetch_symbols(
    quotes: &dyn QuotePort,
    store: &CsvAdapter,
    symbols: &[String],
    lookback_days: i64,
    today: NaiveDate,
) -> Result<FetchSummary, PlaybookError> {
    let mut summary = FetchSummary::default();

    for symbol in symbols {
        let outcome = store.get_data_range(symbol).and_then(|range| {
            let start = match range {
                Some((_, last, _)) => last,
                None => today - Duration::days(lookback_days),
            };
            let bars = quotes.download(symbol, start, today)?;
            if bars.is_empty() {
                return Ok(0);
            }
            store.write_ohlcv(symbol, &bars)
        });
        match outcome {
            Ok(added) => {
                info!(symbol = %symbol, added, "updated price history");
                summary.updated.push((symbol.clone(), added));
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "fetch failed");
                summary.failed.push((symbol.clone(), e.to_string()));
            }
        }
    }

    if summary.updated.is_empty() {
        if let Some((symbol, reason)) = summary.failed.first() {
            return Err(PlaybookError::Fetch {
                symbol: symbol.clone(),
                reason: format!("{} (all {} symbols failed)", reason, summary.failed.len()),
            });
        }
    }
    Ok(summary)
}

#[cfg(feature = "yahoo")]
fn quote_source() -> Result<Box<dyn QuotePort>, PlaybookError> {
    Ok(Box::new(crate::adapters::yahoo_adapter::YahooAdapter::new()?))
}

#[cfg(not(feature = "yahoo"))]
fn quote_source() -> Result<Box<dyn QuotePort>, PlaybookError> {
    Err(PlaybookError::Fetch {
        symbol: "*".to_string(),
        reason: "yahoo feature is required for downloads".to_string(),
    })
}

fn run_fetch(
    config: &dyn ConfigPort,
    universe: Option<&str>,
    symbols: Option<&str>,
) -> Result<(), PlaybookError> {
    validate_fetch(config)?;
    let symbols = resolve_symbols(config, universe, symbols)?;
    let paths = DataPaths::from_config(config);
    let store = CsvAdapter::new(&paths.historical_dir);
    let quotes = quote_source()?;

    let summary = fetch_symbols(
        quotes.as_ref(),
        &store,
        &symbols,
        config.get_int("fetch", "lookback_days", 3650),
        today(),
    )?;
    for (symbol, added) in &summary.updated {
        println!("{symbol}: {added} new bars");
    }
    for (symbol, reason) in &summary.failed {
        println!("{symbol}: failed ({reason})");
    }
    Ok(())
}

fn run_daily(
    config: &dyn ConfigPort,
    universe: Option<&str>,
    skip_fetch: bool,
) -> Result<(), PlaybookError> {
    validate_app_config(config)?;
    let paths = DataPaths::from_config(config);
    let store = CsvAdapter::new(&paths.historical_dir);
    let date = today();

    if !skip_fetch {
        let symbols = resolve_universe(config, universe)?.symbols;
        let fetched = quote_source().and_then(|quotes| {
            fetch_symbols(
                quotes.as_ref(),
                &store,
                &symbols,
                config.get_int("fetch", "lookback_days", 3650),
                date,
            )
        });
        match fetched {
            Ok(summary) => info!(
                updated = summary.updated.len(),
                failed = summary.failed.len(),
                "fetch complete"
            ),
            Err(e) => warn!(error = %e, "fetch failed, scanning stored data"),
        }
    }

    let args = ScanArgs {
        universe: universe.map(str::to_string),
        ..ScanArgs::default()
    };
    let output = run_scan_pipeline(&store, config, &args)?;
    print_signals(&output.result.signals);

    let report = paths
        .reports_dir
        .join(format!("watchlist_{}.md", date.format("%Y-%m-%d")));
    publish_scan(&paths, date, &output, true, Some(&report))
}

fn print_journal(journal: &Journal, open_only: bool) {
    let entries: Vec<_> = journal
        .entries()
        .iter()
        .filter(|e| !open_only || e.is_open())
        .collect();
    if entries.is_empty() {
        println!("No journal entries.");
        return;
    }
    println!(
        "{:>4} {:<8} {:<22} {:<5} {:<10} {:>9} {:>9} {:>6} {:<10} {:>9} {:>10} {:>6}",
        "ID", "SYMBOL", "STRATEGY", "DIR", "ENTRY DATE", "ENTRY", "STOP", "SHARES", "EXIT DATE",
        "EXIT", "PNL", "R"
    );
    for e in entries {
        let exit_date = e.exit_date.map(|d| d.to_string()).unwrap_or_default();
        let exit_price = e.exit_price.map(|p| format!("{p:.2}")).unwrap_or_default();
        let pnl = e.pnl().map(|p| format!("{p:.2}")).unwrap_or_default();
        let r = e.r_multiple().map(|r| format!("{r:.2}")).unwrap_or_default();
        println!(
            "{:>4} {:<8} {:<22} {:<5} {:<10} {:>9.2} {:>9.2} {:>6} {:<10} {:>9} {:>10} {:>6}",
            e.id,
            e.symbol,
            e.strategy_id,
            e.direction,
            e.entry_date,
            e.entry_price,
            e.stop_price,
            e.shares,
            exit_date,
            exit_price,
            pnl,
            r
        );
    }
}

fn format_stats(stats: &TradeStats) -> String {
    let avg_r = stats
        .avg_r_multiple
        .map_or_else(|| "-".to_string(), |r| format!("{r:.2}"));
    format!(
        "{} closed, win rate {:.1}%, avg R {}, expectancy {:.2}, total {:.2}",
        stats.trades,
        stats.win_rate * 100.0,
        avg_r,
        stats.expectancy,
        stats.total_pnl
    )
}

fn print_comparison(strategy: &str, comparison: &PerformanceComparison, tolerance: f64) {
    println!("{strategy}");
    println!("  live:     {}", format_stats(&comparison.live));
    println!("  backtest: {}", format_stats(&comparison.backtest));
    println!(
        "  delta:    win rate {:+.1} pts, avg R {}, expectancy {:+.2}",
        comparison.win_rate_delta * 100.0,
        comparison
            .avg_r_delta
            .map_or_else(|| "-".to_string(), |d| format!("{d:+.2}")),
        comparison.expectancy_delta
    );
    let status = if comparison.is_tracking(tolerance) {
        "tracking"
    } else {
        "diverging"
    };
    println!("  status:   {status} (tolerance {tolerance:.2})");
}

fn run_journal(config: &dyn ConfigPort, action: JournalCommand) -> Result<(), PlaybookError> {
    let paths = DataPaths::from_config(config);
    let port = JournalCsvAdapter::new(&paths.journal_file);
    let mut journal = port.load()?;

    match action {
        JournalCommand::Add {
            strategy,
            symbol,
            direction,
            entry,
            stop,
            shares,
            date,
            notes,
        } => {
            let id = journal.add(NewTrade {
                strategy_id: strategy,
                symbol,
                direction,
                entry_date: date.unwrap_or_else(today),
                entry_price: entry,
                stop_price: stop,
                shares,
                notes,
            })?;
            port.save(&journal)?;
            println!("Recorded trade #{id}");
        }
        JournalCommand::Close { id, price, date } => {
            let entry = journal.close(id, date.unwrap_or_else(today), price)?;
            let message = format!(
                "Closed trade #{} {}: pnl {:.2}, R {}",
                entry.id,
                entry.symbol,
                entry.pnl().unwrap_or_default(),
                entry
                    .r_multiple()
                    .map_or_else(|| "-".to_string(), |r| format!("{r:.2}"))
            );
            port.save(&journal)?;
            println!("{message}");
        }
        JournalCommand::List { open } => print_journal(&journal, open),
        JournalCommand::Stats => {
            let rows = journal.summarize_by_strategy();
            if rows.is_empty() {
                println!("No journal entries.");
            }
            for row in rows {
                println!(
                    "{}: {} open; {}",
                    row.strategy_id,
                    row.open_trades,
                    format_stats(&row.closed)
                );
            }
        }
        JournalCommand::Compare {
            strategy,
            universe,
            symbols,
            tolerance,
        } => {
            let playbook = build_playbook(&strategy, config)?;
            let bt_config = BacktestConfig::from_config(config)?;
            let risk = RiskConfig::from_config(config)?;
            let symbols = resolve_symbols(config, universe.as_deref(), symbols.as_deref())?;
            let data_port = CsvAdapter::new(&paths.historical_dir);

            let outcome = run_backtest_pipeline(
                &data_port,
                playbook.as_ref(),
                &bt_config,
                &risk,
                &symbols,
            )?;
            let comparison = PerformanceComparison::compare(
                journal.stats_for(&strategy),
                TradeStats::from_trades(&outcome.result.portfolio.closed_trades),
            );
            print_comparison(playbook.name(), &comparison, tolerance);
        }
    }
    Ok(())
}

fn run_info(config: &dyn ConfigPort, symbol: Option<&str>) -> Result<(), PlaybookError> {
    let paths = DataPaths::from_config(config);
    let data_port = CsvAdapter::new(&paths.historical_dir);

    let symbols = match symbol {
        Some(s) => vec![s.to_uppercase()],
        None => data_port.list_symbols()?,
    };
    if symbols.is_empty() {
        eprintln!("No price history in {}", paths.historical_dir.display());
    }
    for s in &symbols {
        match data_port.get_data_range(s) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", s, count, min_date, max_date);
            }
            Ok(None) => eprintln!("{}: no data found", s),
            Err(e) => eprintln!("error querying {}: {}", s, e),
        }
    }
    Ok(())
}

fn run_list_symbols(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    let paths = DataPaths::from_config(config);
    let symbols = CsvAdapter::new(&paths.historical_dir).list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", paths.historical_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_validate(config: &dyn ConfigPort) -> Result<(), PlaybookError> {
    validate_app_config(config)?;

    for strategy in get_enabled_strategies(config)? {
        let playbook = build_playbook(strategy.id, config)?;
        let indicators: Vec<String> = playbook
            .indicator_types()?
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("{} [{}]: {}", strategy.name, strategy.id, indicators.join(", "));
    }
    for universe in list_universes(config)? {
        println!("universe {}: {} symbols", universe.name, universe.count());
    }
    if !config.section_keys("backtest").is_empty() {
        validate_backtest_config(config)?;
        println!("backtest settings ok");
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}
