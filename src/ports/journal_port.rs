//! Trade journal persistence port.

use crate::domain::error::PlaybookError;
use crate::domain::journal::Journal;

pub trait JournalPort {
    /// The stored journal; a journal that was never saved is empty.
    fn load(&self) -> Result<Journal, PlaybookError>;

    fn save(&self, journal: &Journal) -> Result<(), PlaybookError>;
}
