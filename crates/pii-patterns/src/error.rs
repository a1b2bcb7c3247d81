//! Error types for pattern compilation and registration.

use thiserror::Error;

use crate::safety::SafetyViolation;

/// Result type for pattern operations.
pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised while compiling or registering patterns.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    /// Pattern source has a structure known to be unsafe.
    #[error("pattern `{kind}` rejected: {violation}")]
    Unsafe {
        kind: String,
        violation: SafetyViolation,
    },

    /// Pattern source failed regex compilation.
    #[error("pattern `{kind}` failed to compile: {message}")]
    Syntax { kind: String, message: String },

    /// Capture group index does not exist in the compiled pattern.
    #[error("pattern `{kind}` has no capture group {group} (pattern defines {available})")]
    BadCapture {
        kind: String,
        group: usize,
        available: usize,
    },

    /// Validator name does not match any built-in validator.
    #[error("pattern `{kind}` references unknown validator `{name}`")]
    UnknownValidator { kind: String, name: String },
}
