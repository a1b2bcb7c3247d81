//! Pattern descriptors: the compiled form the engine consumes and the
//! serializable spec form used for registration and config files.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PatternError, Result};
use crate::{safety, validators};

/// Severity of the information a pattern detects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Low-impact identifiers (zip codes, coarse locations).
    Low,
    /// Identifiers that narrow down an individual.
    #[default]
    Medium,
    /// Direct identifiers and live credentials.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// Broad grouping used for catalog selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// Names, addresses, birth dates.
    Identity,
    /// Email addresses, phone numbers.
    Contact,
    /// Cards, accounts, IBANs, crypto addresses.
    Financial,
    /// IPs, MACs, URLs.
    Network,
    /// Keys, tokens, passwords, connection strings.
    Credential,
    /// Record numbers, provider and insurance identifiers.
    Medical,
    /// SSNs, passports, licenses.
    Government,
    /// Caller-registered patterns.
    #[default]
    Custom,
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatternCategory::Identity => "identity",
            PatternCategory::Contact => "contact",
            PatternCategory::Financial => "financial",
            PatternCategory::Network => "network",
            PatternCategory::Credential => "credential",
            PatternCategory::Medical => "medical",
            PatternCategory::Government => "government",
            PatternCategory::Custom => "custom",
        };
        write!(f, "{}", s)
    }
}

/// Text immediately surrounding a candidate value, handed to validators.
#[derive(Debug, Clone, Copy)]
pub struct ValueContext<'a> {
    /// Slice ending where the value starts.
    pub before: &'a str,
    /// Slice starting where the value ends.
    pub after: &'a str,
}

impl<'a> ValueContext<'a> {
    /// Empty context, for validating values in isolation.
    pub fn empty() -> Self {
        Self {
            before: "",
            after: "",
        }
    }
}

/// Semantic check applied to a candidate value before it is accepted.
pub type Validator = Arc<dyn Fn(&str, &ValueContext<'_>) -> bool + Send + Sync>;

/// A compiled, reusable detection pattern.
#[derive(Clone)]
pub struct PatternDescriptor {
    /// Unique tag, e.g. `email` or `credit_card`.
    pub kind: String,
    /// Compiled expression.
    pub regex: Regex,
    /// Higher priority wins overlapping ranges.
    pub priority: i32,
    /// Placeholder label, e.g. `EMAIL` becomes `[EMAIL_1]`.
    pub label: String,
    /// Severity of a confirmed detection.
    pub severity: Severity,
    /// Catalog grouping.
    pub category: PatternCategory,
    /// When set, the candidate span is this capture group instead of the
    /// whole match. Used by patterns that anchor on surrounding text.
    pub capture: Option<usize>,
    /// Optional semantic check (checksum, range) on the candidate value.
    pub validator: Option<Validator>,
}

impl fmt::Debug for PatternDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternDescriptor")
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .field("severity", &self.severity)
            .field("category", &self.category)
            .field("capture", &self.capture)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl PatternDescriptor {
    /// Run the descriptor's validator, if any, against a candidate value.
    pub fn validate(&self, value: &str, ctx: &ValueContext<'_>) -> bool {
        match &self.validator {
            Some(v) => v(value, ctx),
            None => true,
        }
    }
}

/// Uncompiled pattern definition, the form callers register and config
/// files carry. `compile` vets the source before building a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Unique tag for the pattern.
    pub kind: String,
    /// Regex source.
    pub pattern: String,
    /// Resolution priority, defaults to 50.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Placeholder label; defaults to the uppercased kind.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub category: PatternCategory,
    /// Capture group carrying the value, when not the whole match.
    #[serde(default)]
    pub capture: Option<usize>,
    /// Name of a built-in validator to attach.
    #[serde(default)]
    pub validator: Option<String>,
}

fn default_priority() -> i32 {
    50
}

impl PatternSpec {
    /// Minimal spec with defaults for everything but kind and source.
    pub fn new(kind: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            pattern: pattern.into(),
            priority: default_priority(),
            label: None,
            severity: Severity::default(),
            category: PatternCategory::default(),
            capture: None,
            validator: None,
        }
    }

    /// Set the resolution priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the placeholder label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Vet and compile into a descriptor.
    ///
    /// Fails if the source has an unsafe structure, does not compile,
    /// names a capture group the pattern does not define, or references
    /// an unknown validator.
    pub fn compile(&self) -> Result<PatternDescriptor> {
        safety::vet_pattern(&self.pattern).map_err(|violation| PatternError::Unsafe {
            kind: self.kind.clone(),
            violation,
        })?;

        let regex = Regex::new(&self.pattern).map_err(|e| PatternError::Syntax {
            kind: self.kind.clone(),
            message: e.to_string(),
        })?;

        if let Some(group) = self.capture {
            let available = regex.captures_len() - 1;
            if group == 0 || group > available {
                return Err(PatternError::BadCapture {
                    kind: self.kind.clone(),
                    group,
                    available,
                });
            }
        }

        let validator = match &self.validator {
            Some(name) => Some(validators::by_name(name).ok_or_else(|| {
                PatternError::UnknownValidator {
                    kind: self.kind.clone(),
                    name: name.clone(),
                }
            })?),
            None => None,
        };

        Ok(PatternDescriptor {
            kind: self.kind.clone(),
            regex,
            priority: self.priority,
            label: self
                .label
                .clone()
                .unwrap_or_else(|| default_label(&self.kind)),
            severity: self.severity,
            category: self.category,
            capture: self.capture,
            validator,
        })
    }
}

/// Uppercase the kind into a placeholder label: `credit_card` -> `CREDIT_CARD`.
fn default_label(kind: &str) -> String {
    kind.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
