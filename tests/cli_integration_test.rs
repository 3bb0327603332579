//! CLI integration tests.
//!
//! Each test builds a scratch workspace (INI config plus price CSVs in a temp
//! directory) and drives `cli::run` the way `main` does.

mod common;

use chrono::{Local, NaiveDate};
use clap::Parser;
use common::*;
use playbook::adapters::csv_adapter::CsvAdapter;
use playbook::cli::{self, Cli, fetch_symbols};
use playbook::domain::error::PlaybookError;
use playbook::ports::data_port::DataPort;
use playbook::ports::quote_port::QuotePort;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        Self::with_extra("")
    }

    fn with_extra(extra: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().display().to_string();
        let ini = format!(
            "[data]
historical_dir = {root}/historical
signals_dir = {root}/signals
journal_file = {root}/trades/journal.csv
reports_dir = {root}/reports

[strategies]
enabled = donchian_breakout

[universes]
default = core
core = AAA, BBB

[backtest]
start_date = 2024-01-01
end_date = 2024-12-31
commission_pct = 0

{extra}
"
        );
        let config = dir.path().join("playbook.ini");
        fs::write(&config, ini).unwrap();

        let store = CsvAdapter::new(dir.path().join("historical"));
        store.write_ohlcv("AAA", &breakout_bars("AAA", 249)).unwrap();
        store
            .write_ohlcv("BBB", &trend_bars("BBB", 250, 100.0, 0.0))
            .unwrap();
        store
            .write_ohlcv("CCC", &breakout_then_stop_bars("CCC"))
            .unwrap();

        Workspace { dir, config }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn run(&self, args: &[&str]) -> ExitCode {
        let config = self.config.display().to_string();
        let mut argv = vec!["playbook", "-c", config.as_str()];
        argv.extend_from_slice(args);
        cli::run(Cli::try_parse_from(argv).unwrap())
    }
}

fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(
        format!("{code:?}"),
        format!("{:?}", ExitCode::from(expected)),
        "unexpected exit code"
    );
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

mod config_commands {
    use super::*;

    #[test]
    fn strategies_lists_registry() {
        assert_exit(Workspace::new().run(&["strategies"]), 0);
    }

    #[test]
    fn missing_explicit_config_is_config_error() {
        let code = cli::run(
            Cli::try_parse_from(["playbook", "-c", "/nonexistent/playbook.ini", "strategies"])
                .unwrap(),
        );
        assert_exit(code, 2);
    }

    #[test]
    fn validate_accepts_workspace() {
        assert_exit(Workspace::new().run(&["validate"]), 0);
    }

    #[test]
    fn validate_reports_bad_scan_range() {
        let ws = Workspace::with_extra("[scan]\nmin_risk = 4\nmax_risk = 2\n");
        assert_exit(ws.run(&["validate"]), 2);
    }

    #[test]
    fn validate_reports_bad_playbook_parameters() {
        let ws = Workspace::with_extra("[donchian_breakout]\nentry_period = 0\n");
        assert_exit(ws.run(&["validate"]), 2);
    }

    #[test]
    fn info_and_list_symbols_succeed() {
        let ws = Workspace::new();
        assert_exit(ws.run(&["info"]), 0);
        assert_exit(ws.run(&["info", "aaa"]), 0);
        assert_exit(ws.run(&["list-symbols"]), 0);
    }
}

mod scan_commands {
    use super::*;

    #[test]
    fn scan_writes_signals_and_report() {
        let ws = Workspace::new();
        let report = ws.path("out/watchlist.md");
        let report_arg = report.display().to_string();

        assert_exit(ws.run(&["scan", "--report", report_arg.as_str()]), 0);

        let signals = ws.path(&format!("signals/signals_{}.csv", today().format("%Y-%m-%d")));
        let content = fs::read_to_string(signals).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("AAA,donchian_breakout,Donchian Breakout,LONG"));

        let md = fs::read_to_string(report).unwrap();
        assert!(md.contains("Universe: **core**"));
        assert!(md.contains("- Signals: 1"));
    }

    #[test]
    fn scan_no_write_leaves_no_files() {
        let ws = Workspace::new();
        assert_exit(ws.run(&["scan", "--no-write"]), 0);
        assert!(!ws.path("signals").exists());
    }

    #[test]
    fn scan_rejects_inverted_risk_flags() {
        let ws = Workspace::new();
        assert_exit(
            ws.run(&["scan", "--min-risk", "5", "--max-risk", "1", "--no-write"]),
            2,
        );
    }

    #[test]
    fn scan_unknown_universe_is_config_error() {
        let ws = Workspace::new();
        assert_exit(ws.run(&["scan", "-u", "nope", "--no-write"]), 2);
    }

    #[test]
    fn scan_unknown_strategy_exit_code() {
        let ws = Workspace::new();
        assert_exit(ws.run(&["scan", "-s", "turtle", "--no-write"]), 4);
    }

    #[test]
    fn signals_history_for_symbol() {
        let ws = Workspace::new();
        assert_exit(ws.run(&["signals", "ccc", "donchian_breakout", "--last", "3"]), 0);
        assert_exit(ws.run(&["signals", "zzz", "donchian_breakout"]), 5);
    }

    #[test]
    fn daily_without_fetch_writes_report() {
        let ws = Workspace::new();
        assert_exit(ws.run(&["daily", "--skip-fetch"]), 0);

        let date = today().format("%Y-%m-%d").to_string();
        assert!(ws.path(&format!("signals/signals_{date}.csv")).exists());
        let md = fs::read_to_string(ws.path(&format!("reports/watchlist_{date}.md"))).unwrap();
        assert!(md.contains("### Donchian Breakout (1)"));
    }
}

mod backtest_commands {
    use super::*;

    #[test]
    fn dry_run_succeeds_without_data_access() {
        let ws = Workspace::new();
        assert_exit(
            ws.run(&["backtest", "--strategy", "donchian_breakout", "--dry-run"]),
            0,
        );
    }

    #[test]
    fn backtest_writes_markdown_report() {
        let ws = Workspace::new();
        let output = ws.path("reports/ccc.md");
        let output_arg = output.display().to_string();

        assert_exit(
            ws.run(&[
                "backtest",
                "--strategy",
                "donchian_breakout",
                "--symbols",
                "CCC",
                "-o",
                output_arg.as_str(),
            ]),
            0,
        );

        let md = fs::read_to_string(output).unwrap();
        assert!(md.starts_with("# Backtest: Donchian Breakout"));
        assert!(md.contains("- Symbols: CCC"));
        assert!(md.contains("| `entry_period` | 50 |"));
        assert!(md.contains("stop loss"));
        assert!(md.contains("<svg"));
    }

    #[test]
    fn backtest_default_output_in_reports_dir() {
        let ws = Workspace::new();
        assert_exit(
            ws.run(&["backtest", "--strategy", "donchian_breakout"]),
            0,
        );
        assert!(
            ws.path("reports/backtest_donchian_breakout_2024-01-01_2024-12-31.md")
                .exists()
        );
    }

    #[test]
    fn backtest_unknown_strategy() {
        let ws = Workspace::new();
        assert_exit(ws.run(&["backtest", "--strategy", "turtle", "--dry-run"]), 4);
    }

    #[test]
    fn backtest_without_data_is_data_error() {
        let ws = Workspace::new();
        assert_exit(
            ws.run(&["backtest", "--strategy", "donchian_breakout", "--symbols", "ZZZ"]),
            5,
        );
    }

    #[test]
    fn backtest_bad_dates_is_config_error() {
        let ws = Workspace::new();
        let ini = fs::read_to_string(&ws.config)
            .unwrap()
            .replace("end_date = 2024-12-31", "end_date = 2023-12-31");
        fs::write(&ws.config, ini).unwrap();
        assert_exit(
            ws.run(&["backtest", "--strategy", "donchian_breakout", "--dry-run"]),
            2,
        );
    }
}

mod journal_commands {
    use super::*;

    fn add(ws: &Workspace, symbol: &str) -> ExitCode {
        ws.run(&[
            "journal",
            "add",
            "--strategy",
            "donchian_breakout",
            "--symbol",
            symbol,
            "--entry",
            "105",
            "--stop",
            "99",
            "--shares",
            "19",
            "--date",
            "2024-03-01",
        ])
    }

    #[test]
    fn add_close_list_stats() {
        let ws = Workspace::new();
        assert_exit(add(&ws, "ccc"), 0);
        assert_exit(add(&ws, "aaa"), 0);
        assert_exit(
            ws.run(&["journal", "close", "1", "--price", "111", "--date", "2024-03-08"]),
            0,
        );

        let csv = fs::read_to_string(ws.path("trades/journal.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("1,donchian_breakout,CCC,LONG,2024-03-01,105"));
        assert!(csv.contains("2024-03-08,111"));

        assert_exit(ws.run(&["journal", "list"]), 0);
        assert_exit(ws.run(&["journal", "list", "--open"]), 0);
        assert_exit(ws.run(&["journal", "stats"]), 0);
    }

    #[test]
    fn closing_twice_is_journal_error() {
        let ws = Workspace::new();
        assert_exit(add(&ws, "ccc"), 0);
        assert_exit(ws.run(&["journal", "close", "1", "--price", "100"]), 0);
        assert_exit(ws.run(&["journal", "close", "1", "--price", "101"]), 6);
        assert_exit(ws.run(&["journal", "close", "9", "--price", "101"]), 6);
    }

    #[test]
    fn add_unknown_strategy_is_rejected() {
        let ws = Workspace::new();
        let code = ws.run(&[
            "journal", "add", "--strategy", "turtle", "--symbol", "AAA", "--entry", "10",
            "--stop", "9", "--shares", "1",
        ]);
        assert_exit(code, 4);
        assert!(!ws.path("trades/journal.csv").exists());
    }

    #[test]
    fn compare_against_backtest() {
        let ws = Workspace::new();
        assert_exit(add(&ws, "ccc"), 0);
        assert_exit(ws.run(&["journal", "close", "1", "--price", "95"]), 0);
        assert_exit(
            ws.run(&[
                "journal",
                "compare",
                "--strategy",
                "donchian_breakout",
                "--symbols",
                "CCC",
            ]),
            0,
        );
    }
}

mod fetch {
    use super::*;
    use playbook::domain::ohlcv::OhlcvBar;
    use std::cell::RefCell;

    /// Serves `trend_bars` for known symbols and records requested ranges.
    struct FakeQuotes {
        known: Vec<&'static str>,
        requests: RefCell<Vec<(String, NaiveDate, NaiveDate)>>,
    }

    impl FakeQuotes {
        fn new(known: &[&'static str]) -> Self {
            FakeQuotes {
                known: known.to_vec(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl QuotePort for FakeQuotes {
        fn download(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<OhlcvBar>, PlaybookError> {
            self.requests
                .borrow_mut()
                .push((symbol.to_string(), start, end));
            if !self.known.iter().any(|k| *k == symbol) {
                return Err(PlaybookError::Fetch {
                    symbol: symbol.to_string(),
                    reason: "symbol not found".into(),
                });
            }
            Ok(trend_bars(symbol, 10, 50.0, 1.0)
                .into_iter()
                .filter(|b| b.date >= start && b.date <= end)
                .collect())
        }
    }

    fn store(dir: &Path) -> CsvAdapter {
        CsvAdapter::new(dir.join("historical"))
    }

    #[test]
    fn new_symbol_uses_lookback_and_existing_resumes() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        store
            .write_ohlcv("OLD", &trend_bars("OLD", 5, 50.0, 1.0))
            .unwrap();
        let quotes = FakeQuotes::new(&["NEW", "OLD"]);
        let today = date(2024, 1, 10);

        let summary = fetch_symbols(
            &quotes,
            &store,
            &["NEW".to_string(), "OLD".to_string()],
            30,
            today,
        )
        .unwrap();

        assert_eq!(
            summary.updated,
            vec![("NEW".to_string(), 10), ("OLD".to_string(), 5)]
        );
        let requests = quotes.requests.borrow();
        assert_eq!(requests[0], ("NEW".to_string(), date(2023, 12, 11), today));
        assert_eq!(requests[1], ("OLD".to_string(), day(4), today));
        assert_eq!(store.get_data_range("OLD").unwrap(), Some((day(0), day(9), 10)));
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let quotes = FakeQuotes::new(&["GOOD"]);

        let summary = fetch_symbols(
            &quotes,
            &store,
            &["BAD".to_string(), "GOOD".to_string()],
            30,
            date(2024, 1, 10),
        )
        .unwrap();
        assert_eq!(summary.updated.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "BAD");
    }

    #[test]
    fn every_failure_is_fetch_error() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let quotes = FakeQuotes::new(&[]);

        let err = fetch_symbols(
            &quotes,
            &store,
            &["BAD".to_string()],
            30,
            date(2024, 1, 10),
        )
        .unwrap_err();
        assert!(matches!(err, PlaybookError::Fetch { ref symbol, .. } if symbol == "BAD"));
        assert_exit(ExitCode::from(&err), 7);
    }
}
