//! Error types for the detection engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, RedactError>;

/// Errors surfaced to callers of the engine.
///
/// Pattern timeouts are deliberately absent: a pattern that exceeds its
/// budget is skipped and reported through
/// [`ScanStats::patterns_skipped`](crate::types::ScanStats), never as an
/// error. Collaborator (sink) failures are logged and swallowed.
#[derive(Debug, Error)]
pub enum RedactError {
    /// Input exceeds the configured maximum size. Checked before any
    /// scanning starts; nothing is partially processed.
    #[error("input is {len} bytes, maximum is {max}")]
    InputTooLarge { len: usize, max: usize },

    /// A custom pattern failed vetting or compilation. Fatal to engine
    /// construction, or to the single call that supplied the pattern.
    #[error(transparent)]
    InvalidPattern(#[from] pii_patterns::PatternError),

    /// The operation needs a collaborator that was never configured.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Hash key material could not be generated or decoded.
    #[error("key error: {0}")]
    Key(String),

    /// Options file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Options file could not be parsed or serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_too_large_message() {
        let err = RedactError::InputTooLarge { len: 20, max: 10 };
        assert_eq!(err.to_string(), "input is 20 bytes, maximum is 10");
    }

    #[test]
    fn test_pattern_error_converts() {
        let pattern_err = pii_patterns::PatternSpec::new("bad", "(a+)+")
            .compile()
            .unwrap_err();
        let err: RedactError = pattern_err.into();
        assert!(matches!(err, RedactError::InvalidPattern(_)));
    }
}
