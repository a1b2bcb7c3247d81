//! Placeholder generation and replacement rendering.
//!
//! Placeholder mode numbers detections per label, either from an
//! engine-scoped table (deterministic: the same literal value maps to
//! the same token within and across calls) or from per-call counters
//! (each occurrence takes the next number). Hash mode uses HMAC-SHA256
//! with truncated output so equal values map to stable, non-reversible
//! tokens. Mask, remove and partial modes derive output from the value
//! alone.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{RedactError, Result};
use crate::types::RedactionMode;

/// Number of bytes kept from HMAC output in hash-mode tokens (16 hex chars).
const HASH_TRUNCATION_BYTES: usize = 8;

/// Key material for hash-mode placeholders.
#[derive(Clone)]
pub struct KeyMaterial {
    key: [u8; 32],
}

impl KeyMaterial {
    /// Create new key material with a random key.
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; 32];
        getrandom::getrandom(&mut key)
            .map_err(|e| RedactError::Key(format!("failed to generate random key: {}", e)))?;
        Ok(Self { key })
    }

    /// Create key material from raw bytes.
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Compute HMAC-SHA256 of the input and return truncated hex output.
    fn hash(&self, input: &str) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(input.as_bytes());
        let result = mac.finalize().into_bytes();
        hex::encode(&result[..HASH_TRUNCATION_BYTES])
    }
}

/// Engine-scoped placeholder bookkeeping. Survives across calls so
/// deterministic numbering stays stable on one engine instance.
pub(crate) struct PlaceholderState {
    /// (label, value) -> assigned number, deterministic mode only.
    assigned: HashMap<(String, String), usize>,
    /// label -> next unassigned number.
    next: HashMap<String, usize>,
    key: KeyMaterial,
}

impl PlaceholderState {
    pub fn new(key: KeyMaterial) -> Self {
        Self {
            assigned: HashMap::new(),
            next: HashMap::new(),
            key,
        }
    }

    /// Forget every assigned number. The next call starts numbering
    /// from 1 again.
    pub fn clear(&mut self) {
        self.assigned.clear();
        self.next.clear();
    }

    /// Start rendering replacements for one detect call.
    pub fn session(&mut self, deterministic: bool) -> PlaceholderSession<'_> {
        PlaceholderSession {
            state: self,
            deterministic,
            call_next: HashMap::new(),
        }
    }
}

/// Per-call rendering context. Non-deterministic counters live here and
/// reset when the session is dropped.
pub(crate) struct PlaceholderSession<'a> {
    state: &'a mut PlaceholderState,
    deterministic: bool,
    call_next: HashMap<String, usize>,
}

impl PlaceholderSession<'_> {
    /// Replacement text for one detection under the given mode.
    pub fn replacement(&mut self, mode: RedactionMode, label: &str, value: &str) -> String {
        match mode {
            RedactionMode::Placeholder => self.token(label, value),
            RedactionMode::Hash => format!("[{}#{}]", label, self.state.key.hash(value)),
            RedactionMode::Mask => mask_value(value),
            RedactionMode::Remove => String::new(),
            RedactionMode::Partial => partial_value(value),
        }
    }

    fn token(&mut self, label: &str, value: &str) -> String {
        let number = if self.deterministic {
            match self.state.assigned.get(&(label.to_string(), value.to_string())) {
                Some(&n) => n,
                None => {
                    let slot = self.state.next.entry(label.to_string()).or_insert(1);
                    let n = *slot;
                    *slot += 1;
                    self.state
                        .assigned
                        .insert((label.to_string(), value.to_string()), n);
                    n
                }
            }
        } else {
            let slot = self.call_next.entry(label.to_string()).or_insert(0);
            *slot += 1;
            *slot
        };
        format!("[{}_{}]", label, number)
    }
}

/// Every char except the last four becomes `*`; short values are fully
/// masked.
fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let mut out = "*".repeat(chars.len() - 4);
    out.extend(&chars[chars.len() - 4..]);
    out
}

/// Keep the first and last two chars when the value is long enough to
/// stay unguessable, otherwise mask everything.
fn partial_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let mut out: String = chars[..2].iter().collect();
    out.push_str(&"*".repeat(chars.len() - 4));
    out.extend(&chars[chars.len() - 2..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PlaceholderState {
        PlaceholderState::new(KeyMaterial::from_bytes([0u8; 32]))
    }

    #[test]
    fn test_deterministic_same_value_same_token() {
        let mut state = state();
        let first = {
            let mut session = state.session(true);
            session.replacement(RedactionMode::Placeholder, "EMAIL", "a@b.com")
        };
        // A later call on the same engine sees the same assignment.
        let second = {
            let mut session = state.session(true);
            session.replacement(RedactionMode::Placeholder, "EMAIL", "a@b.com")
        };
        assert_eq!(first, "[EMAIL_1]");
        assert_eq!(first, second);
    }

    #[test]
    fn test_deterministic_numbers_by_first_appearance() {
        let mut state = state();
        let mut session = state.session(true);
        assert_eq!(
            session.replacement(RedactionMode::Placeholder, "EMAIL", "a@b.com"),
            "[EMAIL_1]"
        );
        assert_eq!(
            session.replacement(RedactionMode::Placeholder, "EMAIL", "c@d.com"),
            "[EMAIL_2]"
        );
        assert_eq!(
            session.replacement(RedactionMode::Placeholder, "EMAIL", "a@b.com"),
            "[EMAIL_1]"
        );
    }

    #[test]
    fn test_non_deterministic_numbers_occurrences() {
        let mut state = state();
        {
            let mut session = state.session(false);
            assert_eq!(
                session.replacement(RedactionMode::Placeholder, "PHONE", "555-0100"),
                "[PHONE_1]"
            );
            // Same value again still takes the next number.
            assert_eq!(
                session.replacement(RedactionMode::Placeholder, "PHONE", "555-0100"),
                "[PHONE_2]"
            );
        }
        // Counters restart on the next call.
        let mut session = state.session(false);
        assert_eq!(
            session.replacement(RedactionMode::Placeholder, "PHONE", "555-0100"),
            "[PHONE_1]"
        );
    }

    #[test]
    fn test_labels_count_independently() {
        let mut state = state();
        let mut session = state.session(true);
        assert_eq!(
            session.replacement(RedactionMode::Placeholder, "EMAIL", "a@b.com"),
            "[EMAIL_1]"
        );
        assert_eq!(
            session.replacement(RedactionMode::Placeholder, "PHONE", "555-0100"),
            "[PHONE_1]"
        );
    }

    #[test]
    fn test_clear_restarts_numbering() {
        let mut state = state();
        {
            let mut session = state.session(true);
            session.replacement(RedactionMode::Placeholder, "EMAIL", "a@b.com");
            session.replacement(RedactionMode::Placeholder, "EMAIL", "c@d.com");
        }
        state.clear();
        let mut session = state.session(true);
        assert_eq!(
            session.replacement(RedactionMode::Placeholder, "EMAIL", "c@d.com"),
            "[EMAIL_1]"
        );
    }

    #[test]
    fn test_hash_mode_stable_and_formatted() {
        let mut state = state();
        let first = {
            let mut session = state.session(true);
            session.replacement(RedactionMode::Hash, "EMAIL", "a@b.com")
        };
        let second = {
            let mut session = state.session(false);
            session.replacement(RedactionMode::Hash, "EMAIL", "a@b.com")
        };
        assert_eq!(first, second);
        assert!(first.starts_with("[EMAIL#"));
        assert!(first.ends_with(']'));
        // 8 bytes = 16 hex chars
        assert_eq!(first.len(), "[EMAIL#]".len() + 16);
    }

    #[test]
    fn test_different_keys_different_hashes() {
        let mut a = PlaceholderState::new(KeyMaterial::from_bytes([0u8; 32]));
        let mut b = PlaceholderState::new(KeyMaterial::from_bytes([1u8; 32]));
        let ha = a.session(true).replacement(RedactionMode::Hash, "SSN", "529-45-1283");
        let hb = b.session(true).replacement(RedactionMode::Hash, "SSN", "529-45-1283");
        assert_ne!(ha, hb);
    }

    #[test]
    fn test_mask_keeps_last_four() {
        assert_eq!(mask_value("4111111111111111"), "************1111");
        assert_eq!(mask_value("abcd"), "****");
        assert_eq!(mask_value("abc"), "***");
    }

    #[test]
    fn test_mask_counts_chars_not_bytes() {
        assert_eq!(mask_value("rené@x.io"), "*****x.io");
    }

    #[test]
    fn test_partial_keeps_edges_when_long() {
        assert_eq!(partial_value("alice@example.com"), "al*************om");
        assert_eq!(partial_value("12345678"), "********");
        assert_eq!(partial_value("short"), "*****");
    }

    #[test]
    fn test_remove_is_empty() {
        let mut state = state();
        let mut session = state.session(true);
        assert_eq!(session.replacement(RedactionMode::Remove, "EMAIL", "a@b.com"), "");
    }
}
