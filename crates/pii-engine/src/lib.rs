//! PII detection and redaction engine.
//!
//! This crate provides a single, reusable engine that scans text with a
//! catalog of prioritized patterns, resolves overlapping candidates into
//! one non-overlapping detection set, scores each detection from its
//! surrounding context, and produces a redacted copy of the text with a
//! reversible placeholder map.
//!
//! # Key Features
//!
//! - **Bounded matching**: Every pattern runs under a match-count
//!   ceiling and a wall-clock budget; a pathological pattern is skipped,
//!   never allowed to hang the scan.
//! - **Overlap resolution**: A greedy, priority-ordered sweep guarantees
//!   no two accepted detections share a byte. Multi-pass mode adds an
//!   "earlier pass always wins" layer for credential-like patterns.
//! - **Context scoring**: Document genre and topical cues adjust each
//!   detection's confidence; low-confidence candidates are dropped
//!   before resolution.
//! - **Deterministic placeholders**: In deterministic mode the same
//!   literal value maps to the same token within and across calls on one
//!   engine instance.
//! - **Streaming**: Overlapping windows with exact-range deduplication
//!   scan documents larger than a single pass should hold in flight.
//!
//! # Example
//!
//! ```no_run
//! use pii_engine::{DetectOptions, RedactionEngine};
//!
//! let mut engine = RedactionEngine::new().unwrap();
//! let result = engine
//!     .detect("Contact alice@example.com for info", &DetectOptions::default())
//!     .unwrap();
//! assert_eq!(result.redacted, "Contact [EMAIL_1] for info");
//! ```
//!
//! One engine instance owns its placeholder table and result cache and
//! is not internally synchronized; share it across threads behind a
//! mutex, or give each worker its own instance.

pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod heuristics;
pub mod matcher;
pub mod multipass;
pub mod options;
pub mod placeholder;
pub mod resolver;
pub mod sinks;
pub mod stream;
pub mod types;

pub use context::{ContextWindow, DocumentProfile, Genre};
pub use engine::{EngineBuilder, RedactionEngine};
pub use error::{RedactError, Result};
pub use options::{
    DetectOptions, DEFAULT_MAX_INPUT_SIZE, DEFAULT_MAX_MATCHES, DEFAULT_REGEX_TIMEOUT,
};
pub use placeholder::KeyMaterial;
pub use sinks::{
    AuditRecord, AuditSink, LearningStore, MemoryAuditSink, MetricsSink, SinkError,
    StaticLearningStore,
};
pub use stream::ChunkIter;
pub use types::{ChunkResult, Detection, DetectionResult, RedactionMode, ScanStats};
