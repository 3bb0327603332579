//! CSV price history adapter: one `<SYMBOL>.csv` per symbol.

use crate::domain::error::PlaybookError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

impl CsvRow {
    fn into_bar(self, symbol: &str) -> OhlcvBar {
        OhlcvBar {
            symbol: symbol.to_string(),
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.round() as i64,
        }
    }

    fn from_bar(bar: &OhlcvBar) -> Self {
        CsvRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume as f64,
        }
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol.to_uppercase()))
    }

    fn read_all(&self, symbol: &str) -> Result<Vec<OhlcvBar>, PlaybookError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(PlaybookError::NoData {
                symbol: symbol.to_string(),
            });
        }
        read_bars(&path, symbol)
    }

    /// Merge `bars` into the symbol's file, replacing rows with the same date.
    /// Returns how many dates were not in the file before.
    pub fn write_ohlcv(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<usize, PlaybookError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol);

        let mut merged: BTreeMap<NaiveDate, OhlcvBar> = BTreeMap::new();
        if path.exists() {
            for bar in read_bars(&path, symbol)? {
                merged.insert(bar.date, bar);
            }
        }
        let before = merged.len();
        for bar in bars {
            merged.insert(bar.date, bar.clone());
        }
        let added = merged.len() - before;

        let mut writer = csv::Writer::from_path(&path).map_err(|e| data_error(&path, e))?;
        for bar in merged.values() {
            writer
                .serialize(CsvRow::from_bar(bar))
                .map_err(|e| data_error(&path, e))?;
        }
        writer.flush()?;

        debug!(symbol, added, total = merged.len(), path = %path.display(), "wrote price history");
        Ok(added)
    }
}

fn data_error(path: &Path, e: impl std::fmt::Display) -> PlaybookError {
    PlaybookError::Data {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn read_bars(path: &Path, symbol: &str) -> Result<Vec<OhlcvBar>, PlaybookError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| data_error(path, e))?;

    let mut bars = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| data_error(path, format!("row {}: {}", line + 1, e)))?;
        bars.push(row.into_bar(&symbol.to_uppercase()));
    }
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, PlaybookError> {
        Ok(self
            .read_all(symbol)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, PlaybookError> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().to_uppercase());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PlaybookError> {
        let bars = match self.read_all(symbol) {
            Ok(bars) => bars,
            Err(PlaybookError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
