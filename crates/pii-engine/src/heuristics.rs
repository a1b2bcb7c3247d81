//! False-positive veto rules.
//!
//! An ordered table of rules, each scoped to pattern kinds by substring
//! filter and carrying a severity. A candidate is dropped when any rule
//! whose severity reaches the caller's threshold fires. Severities are
//! fixed per rule: 0.9 for near-certain false positives, 0.7 for
//! likely, 0.5 for weak signals that only matter when the caller sets a
//! permissive threshold. The whole layer is opt-in.

use crate::context::ContextWindow;

/// One veto rule.
pub(crate) struct VetoRule {
    pub name: &'static str,
    /// Applies when the pattern kind contains any of these substrings;
    /// an empty list applies everywhere.
    pub kind_filter: &'static [&'static str],
    pub severity: f64,
    pub check: fn(&str, &ContextWindow) -> bool,
}

pub(crate) static VETO_RULES: &[VetoRule] = &[
    VetoRule {
        name: "test-placeholder-value",
        kind_filter: &[],
        severity: 0.9,
        check: placeholder_value,
    },
    VetoRule {
        name: "currency-amount",
        kind_filter: &[],
        severity: 0.9,
        check: currency_amount,
    },
    VetoRule {
        name: "unit-measurement",
        kind_filter: &[],
        severity: 0.9,
        check: unit_measurement,
    },
    VetoRule {
        name: "percentage",
        kind_filter: &[],
        severity: 0.9,
        check: percentage,
    },
    VetoRule {
        name: "keyword-as-name",
        kind_filter: &["name"],
        severity: 0.9,
        check: keyword_as_name,
    },
    VetoRule {
        name: "repeated-digits",
        kind_filter: &["account", "card", "ssn", "number"],
        severity: 0.9,
        check: repeated_digits,
    },
    VetoRule {
        name: "version-string",
        kind_filter: &["ip"],
        severity: 0.7,
        check: version_string,
    },
    VetoRule {
        name: "date-as-phone",
        kind_filter: &["phone"],
        severity: 0.7,
        check: date_as_phone,
    },
    VetoRule {
        name: "dotted-quad-id",
        kind_filter: &["generic"],
        severity: 0.7,
        check: dotted_quad,
    },
    VetoRule {
        name: "sequential-digits",
        kind_filter: &["account", "card", "ssn", "number"],
        severity: 0.7,
        check: sequential_digits,
    },
    VetoRule {
        name: "epoch-timestamp",
        kind_filter: &["generic"],
        severity: 0.7,
        check: epoch_timestamp,
    },
    VetoRule {
        name: "well-known-port",
        kind_filter: &[],
        severity: 0.5,
        check: well_known_port,
    },
    VetoRule {
        name: "bare-year",
        kind_filter: &[],
        severity: 0.5,
        check: bare_year,
    },
];

/// First rule at or above `threshold` that fires for this candidate,
/// if any. The returned name goes into debug logging.
pub(crate) fn evaluate(
    kind: &str,
    value: &str,
    window: &ContextWindow,
    threshold: f64,
) -> Option<&'static str> {
    VETO_RULES
        .iter()
        .filter(|r| r.severity >= threshold)
        .filter(|r| r.kind_filter.is_empty() || r.kind_filter.iter().any(|f| kind.contains(f)))
        .find(|r| (r.check)(value, window))
        .map(|r| r.name)
}

fn placeholder_value(value: &str, _w: &ContextWindow) -> bool {
    const TOKENS: &[&str] = &[
        "example.com",
        "example.org",
        "example.net",
        "johndoe",
        "john.doe",
        "jane.doe",
        "lorem",
        "dummy",
        "placeholder",
        "@test",
        "test@",
        "xxx-xx-xxxx",
    ];
    let lower = value.to_lowercase();
    TOKENS.iter().any(|t| lower.contains(t))
}

fn currency_amount(_value: &str, w: &ContextWindow) -> bool {
    const CURRENCY_WORDS: &[&str] = &["usd", "eur", "gbp", "dollars", "euros", "pounds"];
    let symbol_before = w
        .before
        .last()
        .is_some_and(|word| word.ends_with(['$', '€', '£']));
    let word_after = w
        .after
        .first()
        .is_some_and(|word| CURRENCY_WORDS.contains(&normalize(word).as_str()));
    symbol_before || word_after
}

fn unit_measurement(_value: &str, w: &ContextWindow) -> bool {
    const UNITS: &[&str] = &[
        "kg", "mg", "km", "cm", "mm", "mi", "mb", "gb", "kb", "tb", "ghz", "mhz", "hz", "ms",
        "sec", "px", "pt", "lbs", "lb", "oz", "mph", "kph", "kwh",
    ];
    w.after
        .first()
        .is_some_and(|word| UNITS.contains(&normalize(word).as_str()))
}

fn percentage(_value: &str, w: &ContextWindow) -> bool {
    w.after.first().is_some_and(|word| word.starts_with('%'))
}

fn keyword_as_name(value: &str, _w: &ContextWindow) -> bool {
    const KEYWORDS: &[&str] = &[
        "if", "else", "while", "for", "return", "true", "false", "null", "none", "self", "this",
        "class", "def", "let", "const", "var", "fn", "match", "struct", "impl", "async", "await",
    ];
    !value.contains(' ') && KEYWORDS.contains(&value.to_lowercase().as_str())
}

fn repeated_digits(value: &str, _w: &ContextWindow) -> bool {
    let mut digits = value.chars().filter(|c| c.is_ascii_digit());
    let first = match digits.next() {
        Some(d) => d,
        None => return false,
    };
    let mut count = 1;
    for d in digits {
        if d != first {
            return false;
        }
        count += 1;
    }
    count >= 4
}

fn version_string(_value: &str, w: &ContextWindow) -> bool {
    const CUES: &[&str] = &["version", "release", "build", "firmware", "upgrade"];
    let v_prefix = w.before.last().is_some_and(|word| normalize(word) == "v");
    v_prefix || has_cue(w, CUES)
}

fn date_as_phone(value: &str, w: &ContextWindow) -> bool {
    const CUES: &[&str] = &["date", "born", "scheduled", "dated", "meeting", "on"];
    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return false;
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    let year_tail = tail
        .parse::<u32>()
        .map(|y| (1900..=2099).contains(&y))
        .unwrap_or(false);
    year_tail && has_cue(w, CUES)
}

fn dotted_quad(value: &str, _w: &ContextWindow) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

fn sequential_digits(value: &str, _w: &ContextWindow) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 8 {
        return false;
    }
    digits.windows(2).all(|w| w[1] == (w[0] + 1) % 10)
}

fn epoch_timestamp(value: &str, _w: &ContextWindow) -> bool {
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match value.len() {
        10 => value
            .parse::<u64>()
            .map(|n| (1_000_000_000..2_000_000_000).contains(&n))
            .unwrap_or(false),
        13 => value.starts_with('1'),
        _ => false,
    }
}

fn well_known_port(value: &str, w: &ContextWindow) -> bool {
    const PORTS: &[u32] = &[
        21, 22, 23, 25, 53, 80, 110, 143, 443, 465, 587, 993, 995, 3306, 3389, 5432, 6379, 8080,
        8443, 9090,
    ];
    const CUES: &[&str] = &["port", "listen", "listening", "bind", "bound"];
    value
        .parse::<u32>()
        .map(|n| PORTS.contains(&n))
        .unwrap_or(false)
        && has_cue(w, CUES)
}

fn bare_year(value: &str, _w: &ContextWindow) -> bool {
    value.len() == 4
        && value
            .parse::<u32>()
            .map(|y| (1900..=2100).contains(&y))
            .unwrap_or(false)
}

fn has_cue(w: &ContextWindow, cues: &[&str]) -> bool {
    w.before
        .iter()
        .chain(w.after.iter())
        .any(|word| cues.contains(&normalize(word).as_str()))
}

fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}
