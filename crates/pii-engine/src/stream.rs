//! Streaming detection over overlapping windows.
//!
//! Window `k` covers `[max(0, k*S - O), min(len, k*S + S))` for chunk
//! size `S` and overlap `O`, adjusted outward to char boundaries. The
//! overlap lets matches that straddle a window seam be seen whole by
//! the next window; a dedup set of exact ranges keeps each detection
//! reported once. A detection touching a non-final window's right edge
//! is deferred entirely, since it may be the truncation of a longer
//! match that the next window will see in full.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use tracing::debug;

use pii_patterns::PatternDescriptor;

use crate::context::{self, ceil_char_boundary, floor_char_boundary, DocumentProfile};
use crate::engine::{scan_document, splice_redacted, RedactionEngine};
use crate::error::{RedactError, Result};
use crate::options::DetectOptions;
use crate::types::{ChunkResult, Detection, DetectionResult, ScanStats};

/// Sequential iterator over streamed windows. Dedup state accumulates
/// as windows are consumed; dropping the iterator aborts the stream.
pub struct ChunkIter<'a> {
    engine: &'a mut RedactionEngine,
    text: &'a str,
    options: DetectOptions,
    pub(crate) active: Vec<PatternDescriptor>,
    whitelist: Vec<String>,
    profile: DocumentProfile,
    chunk_size: usize,
    overlap: usize,
    next_chunk: usize,
    seen: HashSet<(usize, usize)>,
    pub(crate) patterns_run: usize,
    pub(crate) patterns_skipped: Vec<String>,
}

impl Iterator for ChunkIter<'_> {
    type Item = ChunkResult;

    fn next(&mut self) -> Option<ChunkResult> {
        let base = self.next_chunk.checked_mul(self.chunk_size)?;
        if base >= self.text.len() {
            return None;
        }
        let lo = floor_char_boundary(self.text, base.saturating_sub(self.overlap));
        let hi = ceil_char_boundary(
            self.text,
            base.saturating_add(self.chunk_size).min(self.text.len()),
        );
        let window = &self.text[lo..hi];

        let outcome = scan_document(window, &self.active, &self.whitelist, &self.profile, &self.options);
        self.patterns_run += outcome.patterns_run;
        self.patterns_skipped.extend(outcome.patterns_skipped);

        let final_window = hi >= self.text.len();
        let mut session = self.engine.placeholders.session(self.options.deterministic);
        let mut rendered = Vec::with_capacity(outcome.candidates.len());
        for candidate in &outcome.candidates {
            let start = lo + candidate.start;
            let end = lo + candidate.end;
            if end == hi && !final_window {
                continue;
            }
            let descriptor = &self.active[candidate.pattern];
            let placeholder = session.replacement(
                self.options.redaction_mode,
                &descriptor.label,
                &candidate.value,
            );
            rendered.push(Detection {
                kind: descriptor.kind.clone(),
                start,
                end,
                value: candidate.value.clone(),
                placeholder,
                confidence: candidate.confidence,
                severity: descriptor.severity,
            });
        }

        // The redacted window covers every detection it saw, including
        // ones an earlier window already reported.
        let redacted = splice_redacted(window, lo, &rendered);
        let fresh: Vec<Detection> = rendered
            .into_iter()
            .filter(|d| self.seen.insert((d.start, d.end)))
            .collect();

        let chunk_index = self.next_chunk;
        self.next_chunk += 1;
        debug!(
            chunk = chunk_index,
            offset = lo,
            detections = fresh.len(),
            "streamed window"
        );
        Some(ChunkResult {
            chunk_index,
            offset: lo,
            detections: fresh,
            redacted,
        })
    }
}

impl RedactionEngine {
    /// Scan `text` in overlapping windows, yielding one [`ChunkResult`]
    /// per window. Detections carry document coordinates and each exact
    /// range is reported by exactly one window.
    ///
    /// With `deterministic` off, placeholder numbering restarts in
    /// every window, so chunk text stitched together by the caller can
    /// repeat a token like `[EMAIL_1]` for different values. Use
    /// [`process_complete`](RedactionEngine::process_complete) when
    /// numbering must follow document order.
    pub fn detect_stream<'a>(
        &'a mut self,
        text: &'a str,
        options: &DetectOptions,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<ChunkIter<'a>> {
        if chunk_size == 0 {
            return Err(RedactError::Unsupported(
                "streaming requires a non-zero chunk size".to_string(),
            ));
        }
        if text.len() > options.max_input_size {
            return Err(RedactError::InputTooLarge {
                len: text.len(),
                max: options.max_input_size,
            });
        }

        let active = self.active_patterns(options)?;
        let whitelist = self.merged_whitelist(options);
        let profile = if options.enable_context_analysis {
            context::profile_document(text)
        } else {
            DocumentProfile::default()
        };

        Ok(ChunkIter {
            engine: self,
            text,
            options: options.clone(),
            active,
            whitelist,
            profile,
            chunk_size,
            overlap,
            next_chunk: 0,
            seen: HashSet::new(),
            patterns_run: 0,
            patterns_skipped: Vec::new(),
        })
    }

    /// Stream the whole document and reassemble one [`DetectionResult`].
    ///
    /// Placeholders are re-derived in document order, so with an overlap
    /// of at least the longest expected match the result matches a
    /// single [`detect`](RedactionEngine::detect) call.
    pub fn process_complete(
        &mut self,
        text: &str,
        options: &DetectOptions,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<DetectionResult> {
        let started = Instant::now();

        let mut all: Vec<Detection> = Vec::new();
        let (chunks, patterns_run, patterns_skipped, labels) = {
            let mut iter = self.detect_stream(text, options, chunk_size, overlap)?;
            let mut chunks = 0;
            for chunk in iter.by_ref() {
                chunks += 1;
                all.extend(chunk.detections);
            }
            let labels: HashMap<String, String> = iter
                .active
                .iter()
                .map(|d| (d.kind.clone(), d.label.clone()))
                .collect();
            let mut skipped: Vec<String> = Vec::new();
            for kind in &iter.patterns_skipped {
                if !skipped.contains(kind) {
                    skipped.push(kind.clone());
                }
            }
            (chunks, iter.patterns_run, skipped, labels)
        };

        all.sort_by_key(|d| (d.start, d.end));
        let mut merged: Vec<Detection> = Vec::with_capacity(all.len());
        for detection in all {
            let overlaps = merged
                .last()
                .map(|prev| detection.start < prev.end)
                .unwrap_or(false);
            if overlaps {
                debug!(
                    kind = %detection.kind,
                    start = detection.start,
                    "dropping window-boundary duplicate"
                );
                continue;
            }
            merged.push(detection);
        }

        // Re-derive placeholders over the merged set so numbering
        // follows document order, not window order.
        let mut session = self.placeholders.session(options.deterministic);
        for detection in &mut merged {
            let label = labels
                .get(&detection.kind)
                .cloned()
                .unwrap_or_else(|| detection.kind.to_uppercase());
            detection.placeholder =
                session.replacement(options.redaction_mode, &label, &detection.value);
        }

        let redacted = splice_redacted(text, 0, &merged);
        let mut redaction_map = BTreeMap::new();
        for detection in &merged {
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
                detection_count: merged.len(),
                patterns_run,
                patterns_skipped,
                from_cache: false,
                chunks: Some(chunks),
            },
            detections: merged,
            redaction_map,
        };

        self.notify_sinks(&result, options.redaction_mode);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::KeyMaterial;

    fn engine() -> RedactionEngine {
        RedactionEngine::builder()
            .hash_key(KeyMaterial::from_bytes([7u8; 32]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_short_text_is_one_window() {
        let mut engine = engine();
        let options = DetectOptions::default();
        let chunks: Vec<ChunkResult> = engine
            .detect_stream("Contact alice@example.com for info", &options, 4096, 256)
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].detections.len(), 1);
        assert_eq!(chunks[0].redacted, "Contact [EMAIL_1] for info");
    }

    #[test]
    fn test_window_offsets_with_overlap() {
        let mut engine = engine();
        let options = DetectOptions::default();
        let text = "abcdefghijklmnopqrstuvwxy";
        let chunks: Vec<ChunkResult> = engine
            .detect_stream(text, &options, 10, 4)
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[1].offset, 6);
        assert_eq!(chunks[2].offset, 16);
        assert!(chunks.iter().all(|c| c.detections.is_empty()));
    }

    #[test]
    fn test_overlap_region_reported_once() {
        let mut engine = engine();
        let options = DetectOptions::default();
        // The email sits inside both window 0 [0, 30) and window 1
        // [10, 55); only window 0 may report it.
        let text = "mail today alice@example.com has more padding after it.";
        assert_eq!(&text[11..28], "alice@example.com");
        let chunks: Vec<ChunkResult> = engine
            .detect_stream(text, &options, 30, 20)
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].detections.len(), 1);
        assert_eq!(chunks[0].detections[0].start, 11);
        assert_eq!(chunks[0].detections[0].end, 28);
        assert!(chunks[1].detections.is_empty());
        // The second window still redacts the duplicate it saw.
        assert!(!chunks[1].redacted.contains("alice@example.com"));
        assert!(chunks[1].redacted.contains("[EMAIL_1]"));
    }

    #[test]
    fn test_right_edge_match_deferred_to_next_window() {
        let mut engine = engine();
        let options = DetectOptions::default();
        // The email ends exactly at window 0's right edge [0, 30), so
        // it could be a truncation of something longer; window 0 must
        // stay silent and window 1 reports the full range.
        let text = "here is mail bob@mail.acme.net plus padding to extend.";
        assert_eq!(&text[13..30], "bob@mail.acme.net");
        let chunks: Vec<ChunkResult> = engine
            .detect_stream(text, &options, 30, 20)
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].detections.is_empty());
        assert_eq!(chunks[1].detections.len(), 1);
        assert_eq!(chunks[1].detections[0].start, 13);
        assert_eq!(chunks[1].detections[0].end, 30);
        assert_eq!(chunks[1].detections[0].value, "bob@mail.acme.net");
    }

    #[test]
    fn test_seam_straddling_match_found_by_later_window() {
        let mut engine = engine();
        let options = DetectOptions::default();
        // Window 0 covers [0, 30) and cuts the email mid-way; window 1
        // [10, 55) sees it whole.
        let text = "some padding here alice@example.com trailing text.";
        assert_eq!(&text[18..35], "alice@example.com");
        let chunks: Vec<ChunkResult> = engine
            .detect_stream(text, &options, 30, 20)
            .unwrap()
            .collect();
        let all: Vec<&Detection> = chunks.iter().flat_map(|c| c.detections.iter()).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].start, 18);
        assert_eq!(all[0].end, 35);
        assert_eq!(all[0].value, "alice@example.com");
    }

    #[test]
    fn test_nondeterministic_counters_restart_per_window() {
        let mut engine = engine();
        let options = DetectOptions {
            deterministic: false,
            ..DetectOptions::default()
        };
        let text =
            "first note alice@acme.com padding padding second note bob@acme.net tail padding.";
        assert_eq!(&text[11..25], "alice@acme.com");
        assert_eq!(&text[54..66], "bob@acme.net");
        let chunks: Vec<ChunkResult> = engine
            .detect_stream(text, &options, 40, 10)
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 2);
        // Each window numbers from 1, so both emails take [EMAIL_1] in
        // their own chunk text.
        assert_eq!(chunks[0].detections[0].placeholder, "[EMAIL_1]");
        assert_eq!(chunks[1].detections[0].placeholder, "[EMAIL_1]");
        assert_ne!(
            chunks[0].detections[0].value,
            chunks[1].detections[0].value
        );
    }

    #[test]
    fn test_process_complete_matches_detect() {
        let text = "Contact alice@example.com for info, call 555-867-5309 or write to bob@sample.net today.";
        let options = DetectOptions::default();

        let mut direct_engine = engine();
        let direct = direct_engine.detect(text, &options).unwrap();

        let mut streamed_engine = engine();
        let streamed = streamed_engine
            .process_complete(text, &options, 40, 25)
            .unwrap();

        assert_eq!(streamed.redacted, direct.redacted);
        assert_eq!(streamed.redaction_map, direct.redaction_map);
        assert_eq!(streamed.detections.len(), direct.detections.len());
        for (s, d) in streamed.detections.iter().zip(direct.detections.iter()) {
            assert_eq!((s.start, s.end), (d.start, d.end));
            assert_eq!(s.kind, d.kind);
            assert_eq!(s.value, d.value);
            assert_eq!(s.placeholder, d.placeholder);
        }
        assert_eq!(streamed.stats.chunks, Some(3));
        assert!(!streamed.stats.from_cache);
    }

    #[test]
    fn test_process_complete_empty_text() {
        let mut engine = engine();
        let result = engine
            .process_complete("", &DetectOptions::default(), 64, 16)
            .unwrap();
        assert!(result.detections.is_empty());
        assert_eq!(result.redacted, "");
        assert_eq!(result.stats.chunks, Some(0));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut engine = engine();
        let err = engine.detect_stream("text", &DetectOptions::default(), 0, 0);
        assert!(matches!(err, Err(RedactError::Unsupported(_))));
    }

    #[test]
    fn test_oversized_input_rejected_before_streaming() {
        let mut engine = engine();
        let options = DetectOptions {
            max_input_size: 8,
            ..DetectOptions::default()
        };
        let err = engine.detect_stream("far too long for the limit", &options, 4, 2);
        assert!(matches!(err, Err(RedactError::InputTooLarge { .. })));
    }

    #[test]
    fn test_multibyte_seam_is_safe() {
        let mut engine = engine();
        let options = DetectOptions::default();
        // Multibyte chars around every candidate seam; windows must
        // land on char boundaries without panicking.
        let text = "héllo wörld café noël désk mañana überraschung";
        let chunks: Vec<ChunkResult> = engine
            .detect_stream(text, &options, 7, 3)
            .unwrap()
            .collect();
        assert!(!chunks.is_empty());
        let rebuilt: usize = chunks.last().map(|c| c.chunk_index + 1).unwrap();
        assert_eq!(rebuilt, chunks.len());
    }
}
