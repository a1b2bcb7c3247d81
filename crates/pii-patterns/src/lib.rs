//! Pattern catalog for the pii_triage detection engine.
//!
//! This crate owns everything about what gets matched: compiled pattern
//! descriptors with priorities and placeholder labels, a representative
//! built-in set covering common PII and credential shapes, semantic
//! validators (checksums, range checks), and structural vetting that
//! rejects pattern sources with catastrophic-backtracking shapes before
//! they are ever compiled.
//!
//! # Key Features
//!
//! - **Compiled descriptors**: Each pattern carries its kind, priority,
//!   severity, category, placeholder label, and optional capture group
//!   and validator.
//! - **Registration-time vetting**: Nested quantifiers, overlapping
//!   alternation under a quantifier, consecutive quantifiers, and
//!   backreferences are rejected with the offending fragment.
//! - **Semantic validators**: Luhn, IBAN mod-97, IPv4 octet ranges, and
//!   friends filter out values that only look like identifiers.
//! - **Selection**: Kind allow-lists, category filters, and per-kind
//!   priority adjustments without recompiling anything.
//!
//! # Example
//!
//! ```no_run
//! use pii_patterns::{PatternCatalog, PatternSpec};
//!
//! let catalog = PatternCatalog::builtin()
//!     .with_custom(&[PatternSpec::new("employee_id", r"EMP-\d{6}")])
//!     .unwrap();
//! assert!(catalog.get("employee_id").is_some());
//! ```

pub mod builtin;
pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod safety;
pub mod validators;

pub use builtin::builtin_catalog;
pub use catalog::PatternCatalog;
pub use descriptor::{
    PatternCategory, PatternDescriptor, PatternSpec, Severity, Validator, ValueContext,
};
pub use error::{PatternError, Result};
pub use safety::{vet_pattern, SafetyViolation, MAX_PATTERN_LEN};
