#![allow(dead_code)]

use chrono::NaiveDate;
use playbook::adapters::file_config_adapter::FileConfigAdapter;
use playbook::domain::backtest::BacktestConfig;
use playbook::domain::error::PlaybookError;
pub use playbook::domain::ohlcv::OhlcvBar;
use playbook::ports::data_port::DataPort;
use std::collections::HashMap;

/// In-memory price store. Unknown symbols behave like a missing CSV file.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, PlaybookError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(PlaybookError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).ok_or_else(|| PlaybookError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, PlaybookError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PlaybookError> {
        Ok(self.data.get(symbol).and_then(|bars| {
            Some((bars.first()?.date, bars.last()?.date, bars.len()))
        }))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day `i` counted from 2024-01-01.
pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(i as i64)
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1_000_000,
    }
}

pub fn ohlc_bar(symbol: &str, i: usize, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: day(i),
        open,
        high,
        low,
        close,
        volume: 1_000_000,
    }
}

/// `count` daily bars starting 2024-01-01, close moving by `step` per day.
pub fn trend_bars(symbol: &str, count: usize, start_price: f64, step: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let close = start_price + i as f64 * step;
            ohlc_bar(symbol, i, close, close + 1.0, close - 1.0, close)
        })
        .collect()
}

/// Flat at 100 (range 99..101) for `flat` days, then a close at 105 that
/// clears the 50-day channel high.
pub fn breakout_bars(symbol: &str, flat: usize) -> Vec<OhlcvBar> {
    let mut bars = trend_bars(symbol, flat, 100.0, 0.0);
    bars.push(ohlc_bar(symbol, flat, 104.0, 106.0, 104.0, 105.0));
    bars
}

/// A breakout on day 60, ten quiet days, then a gap down through the stop
/// on day 70 and a flat tail.
pub fn breakout_then_stop_bars(symbol: &str) -> Vec<OhlcvBar> {
    let mut bars = breakout_bars(symbol, 60);
    for i in 61..70 {
        bars.push(ohlc_bar(symbol, i, 105.0, 105.5, 104.5, 105.0));
    }
    for i in 70..80 {
        bars.push(ohlc_bar(symbol, i, 95.0, 96.0, 94.0, 95.0));
    }
    bars
}

/// Backtest settings spanning every fixture date, without costs.
pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        commission_pct: 0.0,
        ..BacktestConfig::new(date(2024, 1, 1), date(2024, 12, 31))
    }
}

/// Config with only the Donchian playbook enabled.
pub fn donchian_only_config(extra: &str) -> FileConfigAdapter {
    FileConfigAdapter::from_string(&format!(
        "[strategies]\nenabled = donchian_breakout\n[universes]\ndefault = core\ncore = AAA, BBB\n{}",
        extra
    ))
    .unwrap()
}
