//! Collaborator interfaces for audit, metrics and learned tuning.
//!
//! All collaborators are best-effort: a failure is logged at warn level
//! and never changes the result returned to the caller.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{DetectionResult, RedactionMode};

/// Error returned by a collaborator. Recorded at warn level and
/// dropped; callers of the engine never see it.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One scan, as seen by an audit trail. Values only describe the scan;
/// detected text never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique id for this scan.
    pub scan_id: Uuid,
    /// When the scan completed.
    pub timestamp: DateTime<Utc>,
    /// Number of detections in the final result.
    pub detection_count: usize,
    /// Distinct pattern kinds that fired.
    pub kinds: Vec<String>,
    /// Redaction mode the scan ran under.
    pub mode: RedactionMode,
    /// Wall-clock scan time.
    pub elapsed_ms: u64,
}

/// Trait for receiving audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> Result<(), SinkError>;
}

/// Trait for observing scan outcomes.
pub trait MetricsSink: Send + Sync {
    fn observe(
        &self,
        result: &DetectionResult,
        elapsed_ms: u64,
        mode: RedactionMode,
    ) -> Result<(), SinkError>;
}

/// Trait for feeding learned tuning back into detection. The whitelist
/// is merged with the caller's; priority deltas are applied to the
/// catalog before candidate resolution.
pub trait LearningStore: Send + Sync {
    fn extra_whitelist(&self) -> Result<Vec<String>, SinkError>;
    fn priority_deltas(&self) -> Result<HashMap<String, i32>, SinkError>;
}

/// In-memory audit sink retaining every record (used for tests and
/// small deployments).
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SinkError::new("audit sink lock poisoned"))?;
        records.push(record.clone());
        Ok(())
    }
}

/// Learning store backed by fixed data (used for tests and scaffolding).
#[derive(Debug, Default)]
pub struct StaticLearningStore {
    whitelist: Vec<String>,
    deltas: HashMap<String, i32>,
}

impl StaticLearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_whitelist<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_priority_delta(mut self, kind: impl Into<String>, delta: i32) -> Self {
        self.deltas.insert(kind.into(), delta);
        self
    }
}

impl LearningStore for StaticLearningStore {
    fn extra_whitelist(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.whitelist.clone())
    }

    fn priority_deltas(&self) -> Result<HashMap<String, i32>, SinkError> {
        Ok(self.deltas.clone())
    }
}
