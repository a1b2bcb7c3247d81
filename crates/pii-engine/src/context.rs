//! Context analysis: document profiling and per-candidate scoring.
//!
//! The document is profiled once per call: a genre (email, code, chat,
//! plain) plus topical flags. Each candidate then gets a window of up
//! to five words on each side and the enclosing sentence, and its
//! confidence is the pattern's base score adjusted by a fixed delta
//! table:
//!
//! - code genre: -0.25, or -0.10 for credential kinds, which
//!   legitimately appear in code
//! - example-ish text (doc-level or in the window): -0.30
//! - medical document and medical kind: +0.15
//! - financial document and financial kind: +0.10
//! - technical document and network kind: +0.05
//! - business document and contact kind: +0.05
//! - salutation cue before a NAME candidate: +0.15
//! - category cue word inside the window: +0.10
//!
//! Scores clamp to [0, 1]. With context analysis disabled, every
//! detection carries a fixed 1.0 and none of this runs.

use once_cell::sync::Lazy;
use pii_patterns::{PatternCategory, PatternDescriptor};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Words taken on each side of a candidate.
const WINDOW_WORDS: usize = 5;

/// Document genre, inferred once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Email,
    Code,
    Chat,
    #[default]
    Plain,
}

/// Whole-document features feeding the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentProfile {
    pub genre: Genre,
    pub technical: bool,
    pub medical: bool,
    pub financial: bool,
    pub business: bool,
    /// Text that announces itself as synthetic: examples, fixtures,
    /// lorem ipsum.
    pub exampleish: bool,
}

/// Text surrounding one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Up to five words ending where the candidate starts.
    pub before: Vec<String>,
    /// Up to five words starting where the candidate ends.
    pub after: Vec<String>,
    /// Enclosing sentence, bounded by `.`, `!`, `?`, or a newline.
    pub sentence: String,
    /// Candidate start relative to the document, in [0, 1].
    pub position: f64,
}

static RE_MAIL_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:From|To|Subject|Cc|Reply-To):\s").unwrap());

static RE_CHAT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:\[\d{1,2}:\d{2}(?::\d{2})?\]|<\w+>)\s?").unwrap());

static CODE_MARKERS: &[&str] = &[
    "fn ", "function ", "def ", "class ", "const ", "let ", "var ", "import ", "#include",
    "return ", "impl ", "pub fn",
];

static TECHNICAL_TERMS: &[&str] = &[
    "server", "database", "deploy", "config", "kernel", "compile", "runtime", "endpoint",
    "backend", "latency", "cluster",
];

static MEDICAL_TERMS: &[&str] = &[
    "patient", "diagnosis", "clinic", "physician", "hospital", "prescription", "treatment",
    "symptom", "medical",
];

static FINANCIAL_TERMS: &[&str] = &[
    "account", "payment", "invoice", "billing", "transaction", "balance", "wire", "deposit",
    "statement",
];

static BUSINESS_TERMS: &[&str] = &[
    "meeting", "client", "contract", "proposal", "quarterly", "revenue", "stakeholder",
    "deadline", "agenda",
];

static EXAMPLE_TERMS: &[&str] = &[
    "example", "sample", "dummy", "placeholder", "lorem", "ipsum", "fixture", "fake", "johndoe",
    "testing",
];

static SALUTATIONS: &[&str] = &[
    "dear", "hi", "hello", "mr", "mrs", "ms", "dr", "prof", "sincerely", "regards", "from",
];

/// Classify the whole document. Runs once per detect call.
pub fn profile_document(text: &str) -> DocumentProfile {
    let lower = text.to_lowercase();

    let genre = if RE_MAIL_HEADER.find_iter(text).take(2).count() >= 2 {
        Genre::Email
    } else if RE_CHAT_LINE.find_iter(text).take(2).count() >= 2 {
        Genre::Chat
    } else if looks_like_code(text, &lower) {
        Genre::Code
    } else {
        Genre::Plain
    };

    DocumentProfile {
        genre,
        technical: distinct_terms(&lower, TECHNICAL_TERMS) >= 2,
        medical: distinct_terms(&lower, MEDICAL_TERMS) >= 2,
        financial: distinct_terms(&lower, FINANCIAL_TERMS) >= 2,
        business: distinct_terms(&lower, BUSINESS_TERMS) >= 2,
        exampleish: distinct_terms(&lower, EXAMPLE_TERMS) >= 2,
    }
}

fn looks_like_code(text: &str, lower: &str) -> bool {
    let markers = CODE_MARKERS
        .iter()
        .filter(|m| lower.contains(*m))
        .count();
    let structural = text
        .lines()
        .filter(|line| {
            let t = line.trim_end();
            t.ends_with('{') || t.ends_with('}') || t.ends_with(';')
        })
        .count();
    markers >= 2 && structural >= 2
}

fn distinct_terms(lower: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|t| lower.contains(*t)).count()
}

/// Build the word window and enclosing sentence around a span.
pub fn window_around(text: &str, start: usize, end: usize) -> ContextWindow {
    let before: Vec<String> = text[..start]
        .split_whitespace()
        .rev()
        .take(WINDOW_WORDS)
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: Vec<String> = text[end..]
        .split_whitespace()
        .take(WINDOW_WORDS)
        .map(|w| w.to_string())
        .collect();

    let (s, e) = sentence_bounds(text, start, end);
    ContextWindow {
        before,
        after,
        sentence: text[s..e].trim().to_string(),
        position: start as f64 / text.len().max(1) as f64,
    }
}

/// Expand a span to its enclosing sentence. Terminators inside the
/// span itself do not cut the sentence short.
fn sentence_bounds(text: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let mut s = start.min(bytes.len());
    while s > 0 && !matches!(bytes[s - 1], b'.' | b'!' | b'?' | b'\n') {
        s -= 1;
    }
    let mut e = end.min(bytes.len());
    while e < bytes.len() && !matches!(bytes[e], b'.' | b'!' | b'?' | b'\n') {
        e += 1;
    }
    (s, e)
}

/// Score one candidate from its pattern, window, and document profile.
pub(crate) fn score_candidate(
    descriptor: &PatternDescriptor,
    window: &ContextWindow,
    profile: &DocumentProfile,
) -> f64 {
    let mut score = base_confidence(descriptor);

    if profile.genre == Genre::Code {
        score += if descriptor.category == PatternCategory::Credential {
            -0.10
        } else {
            -0.25
        };
    }

    if profile.exampleish || window_has_term(window, EXAMPLE_TERMS) {
        score -= 0.30;
    }

    match descriptor.category {
        PatternCategory::Medical if profile.medical => score += 0.15,
        PatternCategory::Financial if profile.financial => score += 0.10,
        PatternCategory::Network if profile.technical => score += 0.05,
        PatternCategory::Contact if profile.business => score += 0.05,
        _ => {}
    }

    if descriptor.label == "NAME"
        && window
            .before
            .iter()
            .any(|w| SALUTATIONS.contains(&normalize(w).as_str()))
    {
        score += 0.15;
    }

    if window_has_term(window, category_cues(descriptor.category)) {
        score += 0.10;
    }

    score.clamp(0.0, 1.0)
}

fn base_confidence(descriptor: &PatternDescriptor) -> f64 {
    use pii_patterns::Severity;
    if descriptor.category == PatternCategory::Credential {
        return 0.80;
    }
    match descriptor.severity {
        Severity::High => 0.80,
        Severity::Medium => 0.75,
        Severity::Low => 0.70,
    }
}

fn category_cues(category: PatternCategory) -> &'static [&'static str] {
    match category {
        PatternCategory::Identity => &["name", "address", "born", "resident", "lives"],
        PatternCategory::Contact => &["contact", "email", "phone", "call", "reach", "fax"],
        PatternCategory::Financial => &["account", "payment", "card", "invoice", "bank", "wire"],
        PatternCategory::Network => &["server", "host", "address", "gateway", "endpoint", "ip"],
        PatternCategory::Credential => &["key", "token", "secret", "auth", "login", "password"],
        PatternCategory::Medical => &["patient", "record", "clinic", "doctor", "provider"],
        PatternCategory::Government => &["ssn", "social", "passport", "license", "issued"],
        PatternCategory::Custom => &[],
    }
}

fn window_has_term(window: &ContextWindow, terms: &[&str]) -> bool {
    window
        .before
        .iter()
        .chain(window.after.iter())
        .any(|w| terms.contains(&normalize(w).as_str()))
}

fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Largest char boundary at or below `i`.
pub(crate) fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary at or above `i`.
pub(crate) fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
