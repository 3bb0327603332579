//! Trade journal stored as a single CSV file.

use crate::domain::error::PlaybookError;
use crate::domain::journal::{Journal, JournalEntry};
use crate::ports::journal_port::JournalPort;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct JournalCsvAdapter {
    path: PathBuf,
}

impl JournalCsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn journal_error(&self, e: impl std::fmt::Display) -> PlaybookError {
        PlaybookError::Journal {
            reason: format!("{}: {}", self.path.display(), e),
        }
    }
}

impl JournalPort for JournalCsvAdapter {
    fn load(&self) -> Result<Journal, PlaybookError> {
        if !self.path.exists() {
            return Ok(Journal::default());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.journal_error(e))?;
        let entries = reader
            .deserialize()
            .collect::<Result<Vec<JournalEntry>, _>>()
            .map_err(|e| self.journal_error(e))?;
        debug!(entries = entries.len(), path = %self.path.display(), "loaded journal");
        Ok(Journal::new(entries))
    }

    fn save(&self, journal: &Journal) -> Result<(), PlaybookError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| self.journal_error(e))?;
        for entry in journal.entries() {
            writer.serialize(entry).map_err(|e| self.journal_error(e))?;
        }
        writer.flush()?;
        Ok(())
    }
}
