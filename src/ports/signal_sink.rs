//! Destination for a day's scan signals.

use crate::domain::error::PlaybookError;
use crate::domain::signal::Signal;
use chrono::NaiveDate;
use std::path::PathBuf;

pub trait SignalSink {
    /// Store the signals for `date`, replacing any earlier run for that date.
    /// Returns where they were written.
    fn write_signals(&self, date: NaiveDate, signals: &[Signal]) -> Result<PathBuf, PlaybookError>;

    /// Signals previously stored for `date`; empty when none were written.
    fn read_signals(&self, date: NaiveDate) -> Result<Vec<Signal>, PlaybookError>;
}
