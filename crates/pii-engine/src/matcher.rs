//! Bounded pattern execution.
//!
//! Every pattern runs under two guards: a match-count ceiling and a
//! wall-clock deadline checked between match attempts. The regex engine
//! here is linear-time, so the deadline is a redundant safety net; it
//! still exists because catalog patterns may be exported to engines
//! without that guarantee, and because custom validators run arbitrary
//! caller code.
//!
//! Hitting the ceiling keeps what was found. Hitting the deadline marks
//! the run timed out; the caller discards those partial results and
//! records the skip.

use std::time::{Duration, Instant};

use pii_patterns::{PatternDescriptor, ValueContext};

use crate::context::{ceil_char_boundary, floor_char_boundary};
use crate::types::Candidate;

/// Bytes of surrounding text handed to validators.
const VALIDATOR_CONTEXT: usize = 40;

/// Iterator over one pattern's candidates, bounded by a match ceiling
/// and a deadline. Candidates from one pattern never overlap: the
/// search resumes at the end of the previous full match.
pub(crate) struct BoundedMatches<'a> {
    descriptor: &'a PatternDescriptor,
    pattern: usize,
    text: &'a str,
    at: usize,
    produced: usize,
    max_matches: usize,
    deadline: Instant,
    timed_out: bool,
    done: bool,
}

impl<'a> BoundedMatches<'a> {
    pub fn new(
        descriptor: &'a PatternDescriptor,
        pattern: usize,
        text: &'a str,
        budget: Duration,
        max_matches: usize,
    ) -> Self {
        Self {
            descriptor,
            pattern,
            text,
            at: 0,
            produced: 0,
            max_matches,
            deadline: Instant::now() + budget,
            timed_out: false,
            done: false,
        }
    }

    /// True once the deadline fired. Meaningful after iteration stops.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Advance past an empty match so the search cannot stall.
    fn bump(&mut self, from: usize) {
        let next = self.text[from..].chars().next().map(|c| from + c.len_utf8());
        match next {
            Some(n) => self.at = n,
            None => self.done = true,
        }
    }
}

impl Iterator for BoundedMatches<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if self.done || self.produced >= self.max_matches {
                self.done = true;
                return None;
            }
            if Instant::now() >= self.deadline {
                self.timed_out = true;
                self.done = true;
                return None;
            }
            if self.at > self.text.len() {
                self.done = true;
                return None;
            }

            let caps = match self.descriptor.regex.captures_at(self.text, self.at) {
                Some(caps) => caps,
                None => {
                    self.done = true;
                    return None;
                }
            };
            let full = match caps.get(0) {
                Some(m) => m,
                None => {
                    self.done = true;
                    return None;
                }
            };

            if full.end() == full.start() {
                self.bump(full.end());
                continue;
            }
            self.at = full.end();

            // The candidate span is the capture group when one is
            // declared, the whole match otherwise.
            let span = match self.descriptor.capture {
                Some(group) => match caps.get(group) {
                    Some(m) => m,
                    None => continue,
                },
                None => full,
            };
            if span.end() == span.start() {
                continue;
            }

            let value = span.as_str();
            let ctx = ValueContext {
                before: &self.text
                    [floor_char_boundary(self.text, span.start().saturating_sub(VALIDATOR_CONTEXT))
                        ..span.start()],
                after: &self.text[span.end()
                    ..ceil_char_boundary(self.text, (span.end() + VALIDATOR_CONTEXT).min(self.text.len()))],
            };
            if !self.descriptor.validate(value, &ctx) {
                continue;
            }

            self.produced += 1;
            return Some(Candidate {
                pattern: self.pattern,
                start: span.start(),
                end: span.end(),
                value: value.to_string(),
                confidence: 1.0,
            });
        }
    }
}

/// Everything one pattern produced, plus whether it ran out of budget.
pub(crate) struct MatchRun {
    pub candidates: Vec<Candidate>,
    pub timed_out: bool,
}

/// Run one pattern to completion or until a guard fires.
pub(crate) fn run_pattern(
    descriptor: &PatternDescriptor,
    pattern: usize,
    text: &str,
    budget: Duration,
    max_matches: usize,
) -> MatchRun {
    let mut matches = BoundedMatches::new(descriptor, pattern, text, budget, max_matches);
    let candidates: Vec<Candidate> = matches.by_ref().collect();
    MatchRun {
        timed_out: matches.timed_out(),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pii_patterns::PatternSpec;

    const BUDGET: Duration = Duration::from_millis(100);

    fn descriptor(kind: &str, pattern: &str) -> PatternDescriptor {
        PatternSpec::new(kind, pattern).compile().unwrap()
    }

    #[test]
    fn test_finds_all_matches() {
        let d = descriptor("word", r"\bcat\b");
        let run = run_pattern(&d, 0, "cat dog cat bird cat", BUDGET, 100);
        assert!(!run.timed_out);
        assert_eq!(run.candidates.len(), 3);
        assert_eq!(run.candidates[0].start, 0);
        assert_eq!(run.candidates[1].start, 8);
        assert_eq!(run.candidates[2].start, 17);
    }

    #[test]
    fn test_ceiling_keeps_partial() {
        let d = descriptor("letter", "a");
        let text = "a".repeat(50);
        let run = run_pattern(&d, 0, &text, BUDGET, 5);
        assert!(!run.timed_out);
        assert_eq!(run.candidates.len(), 5);
    }

    #[test]
    fn test_zero_budget_times_out() {
        let d = descriptor("letter", "a");
        let run = run_pattern(&d, 0, "aaaa", Duration::ZERO, 100);
        assert!(run.timed_out);
        assert!(run.candidates.is_empty());
    }

    #[test]
    fn test_empty_matches_skipped_without_stall() {
        let d = descriptor("digits", r"\d*");
        let run = run_pattern(&d, 0, "abc", BUDGET, 100);
        assert!(!run.timed_out);
        assert!(run.candidates.is_empty());
    }

    #[test]
    fn test_matches_within_pattern_never_overlap() {
        let d = descriptor("pair", "aa");
        let run = run_pattern(&d, 0, "aaaa", BUDGET, 100);
        assert_eq!(run.candidates.len(), 2);
        assert_eq!(
            (run.candidates[0].start, run.candidates[0].end),
            (0, 2)
        );
        assert_eq!(
            (run.candidates[1].start, run.candidates[1].end),
            (2, 4)
        );
    }

    #[test]
    fn test_capture_group_span() {
        let mut spec = PatternSpec::new("anchored", r"id:\s*(\d+)");
        spec.capture = Some(1);
        let d = spec.compile().unwrap();
        let run = run_pattern(&d, 0, "the id: 12345 here", BUDGET, 100);
        assert_eq!(run.candidates.len(), 1);
        assert_eq!(run.candidates[0].value, "12345");
        assert_eq!(run.candidates[0].start, 8);
        assert_eq!(run.candidates[0].end, 13);
    }

    #[test]
    fn test_validator_rejects_candidates() {
        let mut spec = PatternSpec::new("card", r"\b\d{16}\b");
        spec.validator = Some("luhn".to_string());
        let d = spec.compile().unwrap();
        let text = "good 4111111111111111 bad 4111111111111112";
        let run = run_pattern(&d, 0, text, BUDGET, 100);
        assert_eq!(run.candidates.len(), 1);
        assert_eq!(run.candidates[0].value, "4111111111111111");
    }

    #[test]
    fn test_multibyte_text_safe() {
        let d = descriptor("word", "née");
        let run = run_pattern(&d, 0, "Anna née Schmidt née Weber", BUDGET, 100);
        assert_eq!(run.candidates.len(), 2);
        for c in &run.candidates {
            assert_eq!(&"Anna née Schmidt née Weber"[c.start..c.end], "née");
        }
    }
}
