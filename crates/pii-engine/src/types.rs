//! Data types shared across the detection pipeline.

use std::collections::BTreeMap;
use std::fmt;

use pii_patterns::Severity;
use serde::{Deserialize, Serialize};

/// How matched values are rewritten in the redacted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RedactionMode {
    /// Numbered token, e.g. `[EMAIL_1]`.
    #[default]
    Placeholder,
    /// Keyed hash of the value, e.g. `[EMAIL#9f2c41d87a03be55]`.
    Hash,
    /// All but the last four characters starred.
    Mask,
    /// Value deleted outright.
    Remove,
    /// First and last two characters kept, middle starred.
    Partial,
}

impl fmt::Display for RedactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RedactionMode::Placeholder => "placeholder",
            RedactionMode::Hash => "hash",
            RedactionMode::Mask => "mask",
            RedactionMode::Remove => "remove",
            RedactionMode::Partial => "partial",
        };
        write!(f, "{}", s)
    }
}

/// One accepted detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Pattern kind that produced this detection.
    pub kind: String,
    /// Byte offset where the value starts.
    pub start: usize,
    /// Byte offset one past the value.
    pub end: usize,
    /// The matched text.
    pub value: String,
    /// Replacement written into the redacted output.
    pub placeholder: String,
    /// Trustworthiness in [0, 1], from context scoring.
    pub confidence: f64,
    /// Severity declared by the pattern.
    pub severity: Severity,
}

impl Detection {
    /// Width of the detected range in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// True when the two ranges share at least one byte.
    pub fn overlaps(&self, other: &Detection) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Counters and diagnostics for one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Wall-clock time for the call.
    pub elapsed_ms: u64,
    /// Number of accepted detections.
    pub detection_count: usize,
    /// Patterns executed to completion.
    pub patterns_run: usize,
    /// Kinds abandoned after exceeding the per-pattern budget. Their
    /// partial matches are discarded.
    pub patterns_skipped: Vec<String>,
    /// Result was served from the cache.
    pub from_cache: bool,
    /// Window count, when the result came from streaming reassembly.
    pub chunks: Option<usize>,
}

/// Complete outcome of one detect call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// The input text, unmodified.
    pub original: String,
    /// Input with every detection replaced.
    pub redacted: String,
    /// Accepted detections ordered by start offset; never overlapping.
    pub detections: Vec<Detection>,
    /// Placeholder token to original value, for restore.
    pub redaction_map: BTreeMap<String, String>,
    pub stats: ScanStats,
}

/// Detections from one streamed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    /// Zero-based window index.
    pub chunk_index: usize,
    /// Byte offset of the window start in the full document.
    pub offset: usize,
    /// Detections in document coordinates, deduplicated against
    /// earlier windows.
    pub detections: Vec<Detection>,
    /// The window text with its detections replaced.
    pub redacted: String,
}

/// A raw pattern hit, before scoring and overlap resolution. The
/// `pattern` field indexes into the active descriptor list for the
/// call, which preserves registration order.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub pattern: usize,
    pub start: usize,
    pub end: usize,
    pub value: String,
    pub confidence: f64,
}
