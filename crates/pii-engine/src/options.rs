//! Per-call detection options.

use std::path::Path;
use std::time::Duration;

use pii_patterns::{PatternCategory, PatternSpec};
use serde::{Deserialize, Serialize};

use crate::types::RedactionMode;

/// Default per-pattern wall-clock budget.
pub const DEFAULT_REGEX_TIMEOUT: Duration = Duration::from_millis(100);

/// Default per-pattern match ceiling.
pub const DEFAULT_MAX_MATCHES: usize = 10_000;

/// Default maximum input size: 10 MiB.
pub const DEFAULT_MAX_INPUT_SIZE: usize = 10 * 1024 * 1024;

/// Options controlling one detect call.
///
/// Every field has a default; `DetectOptions::default()` is the
/// configuration the engine is normally run with. Options round-trip
/// through JSON for config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectOptions {
    /// Restrict scanning to these pattern kinds. Overrides `categories`
    /// when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,

    /// Restrict scanning to these categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<PatternCategory>>,

    /// Extra patterns for this call only. Vetted and compiled per call;
    /// a failure fails the call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_patterns: Vec<PatternSpec>,

    /// Case-insensitive terms; a candidate whose value matches one is
    /// dropped unconditionally.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whitelist: Vec<String>,

    /// Same value gets the same placeholder, within and across calls.
    #[serde(default = "default_true")]
    pub deterministic: bool,

    /// How matched values are rewritten.
    #[serde(default)]
    pub redaction_mode: RedactionMode,

    /// Score detections from surrounding context. When off, every
    /// confidence is a fixed 1.0.
    #[serde(default = "default_true")]
    pub enable_context_analysis: bool,

    /// Detections scoring below this are dropped.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Run the false-positive veto rules.
    #[serde(default)]
    pub enable_false_positive_filter: bool,

    /// A veto rule fires only when its severity reaches this value.
    #[serde(default = "default_fp_threshold")]
    pub false_positive_threshold: f64,

    /// Scan in prioritized passes instead of one sweep.
    #[serde(default)]
    pub enable_multi_pass: bool,

    /// Number of passes when multi-pass is on, clamped to 1..=4.
    #[serde(default = "default_multi_pass_count")]
    pub multi_pass_count: usize,

    /// Reuse results for previously seen inputs.
    #[serde(default)]
    pub enable_cache: bool,

    /// Cache capacity in entries.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Inputs larger than this are rejected outright.
    #[serde(default = "default_max_input_size")]
    pub max_input_size: usize,

    /// Per-pattern wall-clock budget, in milliseconds over JSON.
    #[serde(
        default = "default_regex_timeout_ms",
        rename = "regex_timeout_ms",
        with = "duration_ms"
    )]
    pub regex_timeout: Duration,

    /// Per-pattern match ceiling.
    #[serde(default = "default_max_matches")]
    pub max_matches_per_pattern: usize,
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_fp_threshold() -> f64 {
    0.7
}

fn default_multi_pass_count() -> usize {
    4
}

fn default_cache_size() -> usize {
    100
}

fn default_max_input_size() -> usize {
    DEFAULT_MAX_INPUT_SIZE
}

fn default_regex_timeout_ms() -> Duration {
    DEFAULT_REGEX_TIMEOUT
}

fn default_max_matches() -> usize {
    DEFAULT_MAX_MATCHES
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            patterns: None,
            categories: None,
            custom_patterns: Vec::new(),
            whitelist: Vec::new(),
            deterministic: true,
            redaction_mode: RedactionMode::Placeholder,
            enable_context_analysis: true,
            confidence_threshold: default_confidence_threshold(),
            enable_false_positive_filter: false,
            false_positive_threshold: default_fp_threshold(),
            enable_multi_pass: false,
            multi_pass_count: default_multi_pass_count(),
            enable_cache: false,
            cache_size: default_cache_size(),
            max_input_size: default_max_input_size(),
            regex_timeout: DEFAULT_REGEX_TIMEOUT,
            max_matches_per_pattern: DEFAULT_MAX_MATCHES,
        }
    }
}

impl DetectOptions {
    /// Options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let options: DetectOptions = serde_json::from_str(&content)?;
        Ok(options)
    }

    /// Save options to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Pass count clamped to the supported range.
    pub fn effective_pass_count(&self) -> usize {
        self.multi_pass_count.clamp(1, 4)
    }
}
