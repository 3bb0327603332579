//! Domain error types.

/// A parse error with position information for indicator spec parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for playbook.
#[derive(Debug, thiserror::Error)]
pub enum PlaybookError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    IndicatorSpec(#[from] ParseError),

    #[error("unknown strategy: {id}")]
    UnknownStrategy { id: String },

    #[error("unknown universe: {name}")]
    UnknownUniverse { name: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("journal error: {reason}")]
    Journal { reason: String },

    #[error("fetch failed for {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlaybookError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PlaybookError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        PlaybookError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&PlaybookError> for std::process::ExitCode {
    fn from(err: &PlaybookError) -> Self {
        let code: u8 = match err {
            PlaybookError::Io(_) => 1,
            PlaybookError::ConfigParse { .. }
            | PlaybookError::ConfigMissing { .. }
            | PlaybookError::ConfigInvalid { .. }
            | PlaybookError::UnknownUniverse { .. } => 2,
            PlaybookError::IndicatorSpec(_) | PlaybookError::UnknownStrategy { .. } => 4,
            PlaybookError::Data { .. }
            | PlaybookError::NoData { .. }
            | PlaybookError::InsufficientData { .. } => 5,
            PlaybookError::Journal { .. } => 6,
            PlaybookError::Fetch { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError::new("unknown indicator 'FOO'", 8);
        let rendered = err.display_with_context("SMA(20) FOO(3)");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "SMA(20) FOO(3)");
        assert_eq!(lines[1], "        ^");
        assert!(lines[2].contains("position 8"));
    }

    #[test]
    fn error_messages() {
        let err = PlaybookError::InsufficientData {
            symbol: "SPY".into(),
            bars: 120,
            minimum: 200,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for SPY: have 120 bars, need 200"
        );

        let err = PlaybookError::missing("backtest", "start_date");
        assert_eq!(err.to_string(), "missing config key [backtest] start_date");
    }

    #[test]
    fn parse_error_converts_to_indicator_spec() {
        let err: PlaybookError = ParseError::new("bad", 0).into();
        assert!(matches!(err, PlaybookError::IndicatorSpec(_)));
    }
}
