//! Daily signal files: `<dir>/signals_<YYYY-MM-DD>.csv`.

use crate::domain::error::PlaybookError;
use crate::domain::signal::Signal;
use crate::ports::signal_sink::SignalSink;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column order of [`Signal`]'s serialized fields.
const COLUMNS: [&str; 16] = [
    "date",
    "symbol",
    "strategy_id",
    "strategy",
    "direction",
    "entry_price",
    "stop_price",
    "risk_per_share",
    "shares",
    "reason",
    "entry_type",
    "atr",
    "rsi",
    "volume_ratio",
    "dollar_volume",
    "pole_move_pct",
];

pub struct SignalCsvAdapter {
    dir: PathBuf,
}

impl SignalCsvAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("signals_{}.csv", date.format("%Y-%m-%d")))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> PlaybookError {
    PlaybookError::Data {
        reason: format!("{}: {}", path.display(), e),
    }
}

impl SignalSink for SignalCsvAdapter {
    fn write_signals(&self, date: NaiveDate, signals: &[Signal]) -> Result<PathBuf, PlaybookError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(date);

        // Header is written by hand so a day with no signals still gets one.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| csv_error(&path, e))?;
        writer
            .write_record(COLUMNS)
            .map_err(|e| csv_error(&path, e))?;
        for signal in signals {
            writer.serialize(signal).map_err(|e| csv_error(&path, e))?;
        }
        writer.flush()?;

        info!(count = signals.len(), path = %path.display(), "wrote signals");
        Ok(path)
    }

    fn read_signals(&self, date: NaiveDate) -> Result<Vec<Signal>, PlaybookError> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| csv_error(&path, e))?;
        reader
            .deserialize()
            .collect::<Result<Vec<Signal>, _>>()
            .map_err(|e| csv_error(&path, e))
    }
}
