//! Yahoo Finance daily bars via the v8 chart API.
//!
//! The endpoint is unofficial and changes without notice; failures surface as
//! `PlaybookError::Fetch` and the CSV store stays the source of truth.

use crate::domain::error::PlaybookError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::quote_port::QuotePort;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

fn fetch_error(symbol: &str, reason: impl Into<String>) -> PlaybookError {
    PlaybookError::Fetch {
        symbol: symbol.to_string(),
        reason: reason.into(),
    }
}

impl YahooAdapter {
    pub fn new() -> Result<Self, PlaybookError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) playbook")
            .build()
            .map_err(|e| fetch_error("*", format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d&events=history",
            self.base_url
        )
    }

    fn get_with_retry(&self, symbol: &str, url: &str) -> Result<String, PlaybookError> {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying download");
                thread::sleep(delay);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(fetch_error(symbol, "symbol not found"));
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                    {
                        last_error = format!("HTTP {status}");
                        warn!(symbol, %status, attempt, "download failed");
                        continue;
                    }
                    if !status.is_success() {
                        return Err(fetch_error(symbol, format!("HTTP {status}")));
                    }
                    return resp
                        .text()
                        .map_err(|e| fetch_error(symbol, format!("reading body: {e}")));
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = e.to_string();
                    warn!(symbol, error = %e, attempt, "download failed");
                }
                Err(e) => return Err(fetch_error(symbol, e.to_string())),
            }
        }

        Err(fetch_error(
            symbol,
            format!("gave up after {} attempts: {}", self.max_retries + 1, last_error),
        ))
    }
}

/// Parse a chart API body into bars. Rows where every field is null
/// (holidays, halted days) are skipped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<OhlcvBar>, PlaybookError> {
    let resp: ChartResponse = serde_json::from_str(body)
        .map_err(|e| fetch_error(symbol, format!("unexpected response format: {e}")))?;

    let Some(result) = resp.chart.result else {
        return Err(match resp.chart.error {
            Some(err) => fetch_error(symbol, format!("{}: {}", err.code, err.description)),
            None => fetch_error(symbol, "empty result with no error"),
        });
    };
    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| fetch_error(symbol, "result array is empty"))?;
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| fetch_error(symbol, "no quote data"))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (open, high, low, close, volume) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            field(&quote.volume),
        );

        let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
            if open.is_some() || high.is_some() || low.is_some() || close.is_some() {
                debug!(symbol, ts, "skipping partial row");
            }
            continue;
        };

        let date = DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| fetch_error(symbol, format!("invalid timestamp: {ts}")))?;

        bars.push(OhlcvBar {
            symbol: symbol.to_uppercase(),
            date,
            open,
            high,
            low,
            close,
            volume: volume.unwrap_or(0.0).round() as i64,
        });
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

impl QuotePort for YahooAdapter {
    fn download(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, PlaybookError> {
        let url = self.chart_url(symbol, start, end);
        let body = self.get_with_retry(symbol, &url)?;
        let bars = parse_chart(symbol, &body)?;
        debug!(symbol, bars = bars.len(), "downloaded");
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"chart":{"result":[{"meta":{"symbol":"SPY"},
        "timestamp":[1704205800,1704292200,1704378600],
        "indicators":{"quote":[{
            "open":[472.16,null,468.3],
            "high":[473.67,null,470.96],
            "low":[470.49,null,467.05],
            "close":[472.65,null,467.28],
            "volume":[123623700,null,103585900]}]}}],"error":null}}"#;

    #[test]
    fn parses_rows_and_skips_nulls() {
        let bars = parse_chart("spy", BODY).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].symbol, "SPY");
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!((bars[0].close - 472.65).abs() < 1e-9);
        assert_eq!(bars[0].volume, 123_623_700);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn api_error_is_fetch_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match parse_chart("XXXX", body) {
            Err(PlaybookError::Fetch { symbol, reason }) => {
                assert_eq!(symbol, "XXXX");
                assert!(reason.contains("Not Found"));
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[test]
    fn garbage_body_is_fetch_error() {
        assert!(matches!(
            parse_chart("SPY", "<html>"),
            Err(PlaybookError::Fetch { .. })
        ));
    }

    #[test]
    fn no_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{"open":[],"high":[],"low":[],"close":[],"volume":[]}]}}],"error":null}}"#;
        assert!(parse_chart("SPY", body).unwrap().is_empty());
    }

    #[test]
    fn url_covers_end_date() {
        let adapter = YahooAdapter::new().unwrap();
        let url = adapter.chart_url(
            "AAPL",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert!(url.starts_with("https://query1.finance.yahoo.com/v8/finance/chart/AAPL?"));
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1704240000"));
        assert!(url.contains("interval=1d"));
    }
}
