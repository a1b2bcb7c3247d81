//! The detection engine and its scan pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use pii_patterns::{PatternCatalog, PatternDescriptor, PatternSpec};

use crate::cache::{self, ResultCache};
use crate::context::{self, DocumentProfile};
use crate::error::{RedactError, Result};
use crate::heuristics;
use crate::matcher;
use crate::multipass;
use crate::options::DetectOptions;
use crate::placeholder::{KeyMaterial, PlaceholderState};
use crate::resolver;
use crate::sinks::{AuditRecord, AuditSink, LearningStore, MetricsSink};
use crate::types::{Candidate, Detection, DetectionResult, RedactionMode, ScanStats};

/// Detects and redacts sensitive values in text.
///
/// One instance owns its compiled catalog, the deterministic
/// placeholder table, and the optional result cache. The type is not
/// internally synchronized; share it across threads behind a lock.
pub struct RedactionEngine {
    catalog: PatternCatalog,
    pub(crate) placeholders: PlaceholderState,
    cache: Option<ResultCache>,
    audit: Option<Box<dyn AuditSink>>,
    metrics: Option<Box<dyn MetricsSink>>,
    learning: Option<Box<dyn LearningStore>>,
}

impl fmt::Debug for RedactionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionEngine")
            .field("patterns", &self.catalog.len())
            .field("cache", &self.cache.is_some())
            .field("audit", &self.audit.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("learning", &self.learning.is_some())
            .finish()
    }
}

impl RedactionEngine {
    /// Engine over the built-in pattern catalog.
    pub fn new() -> Result<Self> {
        Self::with_catalog(PatternCatalog::builtin())
    }

    /// Engine over a caller-supplied catalog.
    pub fn with_catalog(catalog: PatternCatalog) -> Result<Self> {
        Ok(Self {
            catalog,
            placeholders: PlaceholderState::new(KeyMaterial::generate()?),
            cache: None,
            audit: None,
            metrics: None,
            learning: None,
        })
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Scan `text` and return the redacted output with its detections.
    ///
    /// Fails fast on oversized input or an invalid per-call custom
    /// pattern; a pattern exceeding its time budget is skipped and
    /// reported through [`ScanStats::patterns_skipped`], never as an
    /// error.
    pub fn detect(&mut self, text: &str, options: &DetectOptions) -> Result<DetectionResult> {
        let started = Instant::now();

        if text.len() > options.max_input_size {
            return Err(RedactError::InputTooLarge {
                len: text.len(),
                max: options.max_input_size,
            });
        }

        let key = options.enable_cache.then(|| cache::fingerprint(text));
        if let (Some(key), Some(cache)) = (&key, self.cache.as_mut()) {
            if let Some(mut hit) = cache.get(key) {
                debug!("returning cached result");
                hit.stats.from_cache = true;
                return Ok(hit);
            }
        }

        let active = self.active_patterns(options)?;
        let whitelist = self.merged_whitelist(options);
        let profile = if options.enable_context_analysis {
            context::profile_document(text)
        } else {
            DocumentProfile::default()
        };

        let outcome = scan_document(text, &active, &whitelist, &profile, options);

        let mut session = self.placeholders.session(options.deterministic);
        let mut detections = Vec::with_capacity(outcome.candidates.len());
        for candidate in &outcome.candidates {
            let descriptor = &active[candidate.pattern];
            let placeholder =
                session.replacement(options.redaction_mode, &descriptor.label, &candidate.value);
            detections.push(Detection {
                kind: descriptor.kind.clone(),
                start: candidate.start,
                end: candidate.end,
                value: candidate.value.clone(),
                placeholder,
                confidence: candidate.confidence,
                severity: descriptor.severity,
            });
        }

        let redacted = splice_redacted(text, 0, &detections);
        let mut redaction_map = BTreeMap::new();
        for detection in &detections {
            redaction_map
                .entry(detection.placeholder.clone())
                .or_insert_with(|| detection.value.clone());
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let result = DetectionResult {
            original: text.to_string(),
            redacted,
            stats: ScanStats {
                elapsed_ms,
                detection_count: detections.len(),
                patterns_run: outcome.patterns_run,
                patterns_skipped: outcome.patterns_skipped,
                from_cache: false,
                chunks: None,
            },
            detections,
            redaction_map,
        };

        debug!(
            detections = result.detections.len(),
            patterns = result.stats.patterns_run,
            elapsed_ms,
            "scan complete"
        );

        self.notify_sinks(&result, options.redaction_mode);

        if let Some(key) = key {
            let cache = self
                .cache
                .get_or_insert_with(|| ResultCache::new(options.cache_size));
            // The requested size can change between calls; the cache
            // follows the latest one.
            cache.set_capacity(options.cache_size);
            cache.put(key, result.clone());
        }

        Ok(result)
    }

    /// Reverse a redaction by substituting placeholders back to their
    /// original values. Longer placeholders are substituted first so a
    /// token that prefixes another cannot corrupt it.
    pub fn restore(&self, redacted: &str, redaction_map: &BTreeMap<String, String>) -> String {
        let mut entries: Vec<(&String, &String)> = redaction_map
            .iter()
            .filter(|(placeholder, _)| !placeholder.is_empty())
            .collect();
        entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then(a.cmp(b)));

        let mut out = redacted.to_string();
        for (placeholder, value) in entries {
            out = out.replace(placeholder.as_str(), value.as_str());
        }
        out
    }

    /// Learned whitelist entries from the configured learning store.
    pub fn learned_whitelist(&self) -> Result<Vec<String>> {
        let store = self.learning.as_ref().ok_or_else(|| {
            RedactError::Unsupported("learned whitelist requires a learning store".to_string())
        })?;
        match store.extra_whitelist() {
            Ok(list) => Ok(list),
            Err(e) => {
                warn!(error = %e, "learning store whitelist query failed");
                Ok(Vec::new())
            }
        }
    }

    pub fn clear_cache(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map(|c| c.len()).unwrap_or(0)
    }

    /// Drop all deterministic placeholder assignments. Subsequent calls
    /// number values from 1 again.
    pub fn clear_placeholders(&mut self) {
        self.placeholders.clear();
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Active descriptors for one call: the catalog filtered by the
    /// caller's selections, per-call custom patterns appended, learned
    /// priority adjustments applied.
    pub(crate) fn active_patterns(
        &self,
        options: &DetectOptions,
    ) -> Result<Vec<PatternDescriptor>> {
        let mut active: Vec<PatternDescriptor> = self
            .catalog
            .select(options.patterns.as_deref(), options.categories.as_deref())
            .into_iter()
            .cloned()
            .collect();

        for spec in &options.custom_patterns {
            active.push(spec.compile()?);
        }

        if let Some(store) = &self.learning {
            match store.priority_deltas() {
                Ok(deltas) => {
                    for descriptor in &mut active {
                        if let Some(delta) = deltas.get(&descriptor.kind) {
                            descriptor.priority = descriptor.priority.saturating_add(*delta);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "learning store priority query failed"),
            }
        }

        Ok(active)
    }

    /// Caller whitelist merged with learned entries, lowercased once.
    pub(crate) fn merged_whitelist(&self, options: &DetectOptions) -> Vec<String> {
        let mut whitelist: Vec<String> =
            options.whitelist.iter().map(|w| w.to_lowercase()).collect();
        if let Some(store) = &self.learning {
            match store.extra_whitelist() {
                Ok(extra) => whitelist.extend(extra.iter().map(|w| w.to_lowercase())),
                Err(e) => warn!(error = %e, "learning store whitelist query failed"),
            }
        }
        whitelist
    }

    /// Best-effort delivery to audit and metrics sinks. Failures are
    /// logged and dropped.
    pub(crate) fn notify_sinks(&self, result: &DetectionResult, mode: RedactionMode) {
        if let Some(sink) = &self.audit {
            let mut kinds: Vec<String> = Vec::new();
            for detection in &result.detections {
                if !kinds.contains(&detection.kind) {
                    kinds.push(detection.kind.clone());
                }
            }
            let record = AuditRecord {
                scan_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                detection_count: result.detections.len(),
                kinds,
                mode,
                elapsed_ms: result.stats.elapsed_ms,
            };
            if let Err(e) = sink.record(&record) {
                warn!(error = %e, "audit sink failed");
            }
        }
        if let Some(sink) = &self.metrics {
            if let Err(e) = sink.observe(result, result.stats.elapsed_ms, mode) {
                warn!(error = %e, "metrics sink failed");
            }
        }
    }
}

/// Configures a [`RedactionEngine`].
#[derive(Default)]
pub struct EngineBuilder {
    catalog: Option<PatternCatalog>,
    custom: Vec<PatternSpec>,
    hash_key: Option<KeyMaterial>,
    audit: Option<Box<dyn AuditSink>>,
    metrics: Option<Box<dyn MetricsSink>>,
    learning: Option<Box<dyn LearningStore>>,
}

impl EngineBuilder {
    /// Replace the built-in catalog.
    pub fn catalog(mut self, catalog: PatternCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register a custom pattern for every call on the built engine.
    /// Vetting happens at build time and failure is fatal there.
    pub fn custom_pattern(mut self, spec: PatternSpec) -> Self {
        self.custom.push(spec);
        self
    }

    /// Key material for hash-mode placeholders. Generated when absent.
    pub fn hash_key(mut self, key: KeyMaterial) -> Self {
        self.hash_key = Some(key);
        self
    }

    pub fn audit_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Box::new(sink));
        self
    }

    pub fn metrics_sink(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.metrics = Some(Box::new(sink));
        self
    }

    pub fn learning_store(mut self, store: impl LearningStore + 'static) -> Self {
        self.learning = Some(Box::new(store));
        self
    }

    pub fn build(self) -> Result<RedactionEngine> {
        let catalog = self
            .catalog
            .unwrap_or_else(PatternCatalog::builtin)
            .with_custom(&self.custom)?;
        let key = match self.hash_key {
            Some(key) => key,
            None => KeyMaterial::generate()?,
        };
        Ok(RedactionEngine {
            catalog,
            placeholders: PlaceholderState::new(key),
            cache: None,
            audit: self.audit,
            metrics: self.metrics,
            learning: self.learning,
        })
    }
}

/// Candidates accepted for a stretch of text, with per-pattern
/// bookkeeping.
pub(crate) struct ScanOutcome {
    pub candidates: Vec<Candidate>,
    pub patterns_run: usize,
    pub patterns_skipped: Vec<String>,
}

/// Run the full match/score/filter/resolve pipeline over `text`.
///
/// With multi-pass enabled the patterns are banded by priority and each
/// band's accepted ranges seed the next band's overlap sweep.
pub(crate) fn scan_document(
    text: &str,
    active: &[PatternDescriptor],
    whitelist: &[String],
    profile: &DocumentProfile,
    options: &DetectOptions,
) -> ScanOutcome {
    let groups = if options.enable_multi_pass {
        multipass::partition(active, options.effective_pass_count())
    } else {
        vec![(0..active.len()).collect()]
    };

    let mut outcome = ScanOutcome {
        candidates: Vec::new(),
        patterns_run: 0,
        patterns_skipped: Vec::new(),
    };
    let mut seeds: Vec<(usize, usize)> = Vec::new();

    for (pass, group) in groups.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        if options.enable_multi_pass {
            debug!(
                band = multipass::PASS_BANDS[pass].name,
                patterns = group.len(),
                "scanning band"
            );
        }

        let mut pool: Vec<Candidate> = Vec::new();
        for &idx in group {
            let descriptor = &active[idx];
            let run = matcher::run_pattern(
                descriptor,
                idx,
                text,
                options.regex_timeout,
                options.max_matches_per_pattern,
            );
            if run.timed_out {
                warn!(kind = %descriptor.kind, "pattern exceeded its time budget, skipping");
                outcome.patterns_skipped.push(descriptor.kind.clone());
                continue;
            }
            outcome.patterns_run += 1;
            pool.extend(run.candidates);
        }

        let mut kept = Vec::with_capacity(pool.len());
        for mut candidate in pool {
            let descriptor = &active[candidate.pattern];
            if whitelisted(&candidate.value, whitelist) {
                continue;
            }
            let window = (options.enable_context_analysis
                || options.enable_false_positive_filter)
                .then(|| context::window_around(text, candidate.start, candidate.end));
            candidate.confidence = match &window {
                Some(w) if options.enable_context_analysis => {
                    context::score_candidate(descriptor, w, profile)
                }
                _ => 1.0,
            };
            if candidate.confidence < options.confidence_threshold {
                continue;
            }
            if options.enable_false_positive_filter {
                if let Some(w) = &window {
                    if let Some(rule) = heuristics::evaluate(
                        &descriptor.kind,
                        &candidate.value,
                        w,
                        options.false_positive_threshold,
                    ) {
                        debug!(kind = %descriptor.kind, rule, "candidate vetoed");
                        continue;
                    }
                }
            }
            kept.push(candidate);
        }

        let accepted = resolver::resolve(kept, active, &seeds);
        seeds.extend(accepted.iter().map(|c| (c.start, c.end)));
        outcome.candidates.extend(accepted);
    }

    outcome.candidates.sort_by_key(|c| c.start);
    outcome
}

fn whitelisted(value: &str, whitelist: &[String]) -> bool {
    if whitelist.is_empty() {
        return false;
    }
    let lower = value.to_lowercase();
    whitelist
        .iter()
        .any(|entry| lower.contains(entry.as_str()) || entry.contains(&lower))
}

/// Rebuild a stretch of text with placeholders spliced over detection
/// ranges. `base` is the document offset of `text`; detections carry
/// document coordinates, are sorted, and never overlap.
pub(crate) fn splice_redacted(text: &str, base: usize, detections: &[Detection]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for detection in detections {
        let start = detection.start - base;
        out.push_str(&text[last..start]);
        out.push_str(&detection.placeholder);
        last = detection.end - base;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MemoryAuditSink, StaticLearningStore};
    use std::sync::Arc;

    fn engine() -> RedactionEngine {
        RedactionEngine::builder()
            .hash_key(KeyMaterial::from_bytes([7u8; 32]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_detect_email_basic() {
        let mut engine = engine();
        let result = engine
            .detect("Contact alice@example.com for info", &DetectOptions::default())
            .unwrap();
        assert_eq!(result.redacted, "Contact [EMAIL_1] for info");
        assert_eq!(result.detections.len(), 1);
        let detection = &result.detections[0];
        assert_eq!(detection.kind, "email");
        assert_eq!(detection.value, "alice@example.com");
        assert_eq!(detection.start, 8);
        assert_eq!(detection.end, 25);
        assert_eq!(
            result.redaction_map.get("[EMAIL_1]"),
            Some(&"alice@example.com".to_string())
        );
        assert!(!result.stats.from_cache);
    }

    #[test]
    fn test_deterministic_placeholder_across_calls() {
        let mut engine = engine();
        let options = DetectOptions::default();
        let first = engine.detect("Mail alice@example.com today", &options).unwrap();
        let second = engine
            .detect("Reply to alice@example.com and bob@example.net", &options)
            .unwrap();
        assert_eq!(first.detections[0].placeholder, "[EMAIL_1]");
        assert_eq!(second.detections[0].placeholder, "[EMAIL_1]");
        assert_eq!(second.detections[1].placeholder, "[EMAIL_2]");
    }

    #[test]
    fn test_input_too_large_rejected() {
        let mut engine = engine();
        let options = DetectOptions {
            max_input_size: 16,
            ..DetectOptions::default()
        };
        let err = engine.detect("this input is longer than sixteen bytes", &options);
        assert!(matches!(
            err,
            Err(RedactError::InputTooLarge { len: 39, max: 16 })
        ));
    }

    #[test]
    fn test_builder_rejects_unsafe_custom_pattern() {
        let result = RedactionEngine::builder()
            .custom_pattern(PatternSpec::new("bad", r"(\w*)*x"))
            .build();
        assert!(matches!(result, Err(RedactError::InvalidPattern(_))));
    }

    #[test]
    fn test_per_call_custom_pattern_invalid_fails_that_call() {
        let mut engine = engine();
        let options = DetectOptions {
            custom_patterns: vec![PatternSpec::new("bad", r"(a+)+")],
            ..DetectOptions::default()
        };
        assert!(matches!(
            engine.detect("anything", &options),
            Err(RedactError::InvalidPattern(_))
        ));
        // The engine stays usable afterwards.
        assert!(engine.detect("anything", &DetectOptions::default()).is_ok());
    }

    #[test]
    fn test_whitelist_suppresses_detection() {
        let mut engine = engine();
        let options = DetectOptions {
            whitelist: vec!["ALICE@EXAMPLE.COM".to_string()],
            ..DetectOptions::default()
        };
        let result = engine
            .detect("Contact alice@example.com for info", &options)
            .unwrap();
        assert!(result.detections.is_empty());
        assert_eq!(result.redacted, result.original);
    }

    #[test]
    fn test_learned_whitelist_requires_store() {
        let engine = engine();
        assert!(matches!(
            engine.learned_whitelist(),
            Err(RedactError::Unsupported(_))
        ));
    }

    #[test]
    fn test_learning_store_whitelist_applies() {
        let mut engine = RedactionEngine::builder()
            .learning_store(StaticLearningStore::new().with_whitelist(["alice@example.com"]))
            .build()
            .unwrap();
        let result = engine
            .detect("Contact alice@example.com for info", &DetectOptions::default())
            .unwrap();
        assert!(result.detections.is_empty());
        assert_eq!(engine.learned_whitelist().unwrap().len(), 1);
    }

    #[test]
    fn test_cache_round_trip() {
        let mut engine = engine();
        let options = DetectOptions {
            enable_cache: true,
            ..DetectOptions::default()
        };
        let text = "Contact alice@example.com for info";
        let first = engine.detect(text, &options).unwrap();
        assert!(!first.stats.from_cache);
        assert_eq!(engine.cache_len(), 1);

        let second = engine.detect(text, &options).unwrap();
        assert!(second.stats.from_cache);
        assert_eq!(second.redacted, first.redacted);

        engine.clear_cache();
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn test_cache_capacity_follows_latest_options() {
        let mut engine = engine();
        let big = DetectOptions {
            enable_cache: true,
            cache_size: 3,
            ..DetectOptions::default()
        };
        for text in ["one a@acme.net", "two b@acme.net", "three c@acme.net"] {
            engine.detect(text, &big).unwrap();
        }
        assert_eq!(engine.cache_len(), 3);

        // Shrinking the requested size takes effect on the next call.
        let small = DetectOptions {
            enable_cache: true,
            cache_size: 1,
            ..DetectOptions::default()
        };
        engine.detect("four d@acme.net", &small).unwrap();
        assert_eq!(engine.cache_len(), 1);
        let hit = engine.detect("four d@acme.net", &small).unwrap();
        assert!(hit.stats.from_cache);
    }

    #[test]
    fn test_restore_round_trip() {
        let mut engine = engine();
        let text = "Contact alice@example.com or call 555-867-5309 now";
        let result = engine.detect(text, &DetectOptions::default()).unwrap();
        assert_ne!(result.redacted, text);
        let restored = engine.restore(&result.redacted, &result.redaction_map);
        assert_eq!(restored, text);
    }

    #[test]
    fn test_restore_substitutes_longest_placeholder_first() {
        let engine = engine();
        let mut map = BTreeMap::new();
        map.insert("[EMAIL_1]".to_string(), "a@b.co".to_string());
        map.insert("[EMAIL_10]".to_string(), "j@k.lm".to_string());
        let restored = engine.restore("see [EMAIL_10] then [EMAIL_1]", &map);
        assert_eq!(restored, "see j@k.lm then a@b.co");
    }

    #[test]
    fn test_remove_mode_leaves_no_trace() {
        let mut engine = engine();
        let options = DetectOptions {
            redaction_mode: RedactionMode::Remove,
            ..DetectOptions::default()
        };
        let result = engine
            .detect("Contact alice@example.com for info", &options)
            .unwrap();
        assert_eq!(result.redacted, "Contact  for info");
        // The empty placeholder still maps back for bookkeeping, but
        // restore ignores it.
        assert_eq!(
            result.redaction_map.get(""),
            Some(&"alice@example.com".to_string())
        );
        assert_eq!(
            engine.restore(&result.redacted, &result.redaction_map),
            "Contact  for info"
        );
    }

    #[test]
    fn test_audit_sink_observes_scan() {
        let sink = Arc::new(MemoryAuditSink::new());
        struct Forward(Arc<MemoryAuditSink>);
        impl crate::sinks::AuditSink for Forward {
            fn record(&self, record: &AuditRecord) -> std::result::Result<(), crate::sinks::SinkError> {
                self.0.record(record)
            }
        }
        let mut engine = RedactionEngine::builder()
            .audit_sink(Forward(Arc::clone(&sink)))
            .build()
            .unwrap();
        engine
            .detect("Contact alice@example.com for info", &DetectOptions::default())
            .unwrap();
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].detection_count, 1);
        assert_eq!(records[0].kinds, vec!["email".to_string()]);
    }

    #[test]
    fn test_failing_sink_never_affects_result() {
        struct FailingSink;
        impl crate::sinks::AuditSink for FailingSink {
            fn record(&self, _: &AuditRecord) -> std::result::Result<(), crate::sinks::SinkError> {
                Err(crate::sinks::SinkError::new("disk full"))
            }
        }
        let mut engine = RedactionEngine::builder().audit_sink(FailingSink).build().unwrap();
        let result = engine
            .detect("Contact alice@example.com for info", &DetectOptions::default())
            .unwrap();
        assert_eq!(result.detections.len(), 1);
    }

    #[test]
    fn test_context_disabled_pins_confidence() {
        let mut engine = engine();
        let options = DetectOptions {
            enable_context_analysis: false,
            ..DetectOptions::default()
        };
        let result = engine
            .detect("Contact alice@example.com for info", &options)
            .unwrap();
        assert_eq!(result.detections[0].confidence, 1.0);
    }

    #[test]
    fn test_pattern_filter_limits_scan() {
        let mut engine = engine();
        let options = DetectOptions {
            patterns: Some(vec!["phone_us".to_string()]),
            ..DetectOptions::default()
        };
        let result = engine
            .detect("alice@example.com or 555-867-5309", &options)
            .unwrap();
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].kind, "phone_us");
        assert_eq!(result.stats.patterns_run, 1);
    }
}
