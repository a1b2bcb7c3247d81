//! The built-in pattern set.
//!
//! Priorities form bands used by multi-pass scanning: credentials land
//! in 90..=100, government and financial identifiers in 70..=89,
//! network identifiers in 50..=69, contact and identity in 30..=49,
//! and fuzzy catch-alls below 30. Within a band, order here is the
//! registration order and breaks priority ties.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::descriptor::{PatternCategory, PatternDescriptor, Severity};
use crate::validators;

struct BuiltinDef {
    kind: &'static str,
    label: &'static str,
    category: PatternCategory,
    severity: Severity,
    priority: i32,
    source: &'static str,
    capture: Option<usize>,
    validator: Option<&'static str>,
}

static BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        kind: "private_key",
        label: "PRIVATE_KEY",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 100,
        source: r"-----BEGIN [A-Z ]*PRIVATE KEY-----",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "aws_access_key",
        label: "AWS_ACCESS_KEY",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 100,
        source: r"\bAKIA[0-9A-Z]{16}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "github_token",
        label: "GITHUB_TOKEN",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 99,
        source: r"\bgh[pousr]_[A-Za-z0-9_]{36,255}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "ai_api_key",
        label: "AI_API_KEY",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 99,
        source: r"\bsk-(?:ant-)?[A-Za-z0-9_-]{20,}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "aws_secret_key",
        label: "AWS_SECRET_KEY",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 99,
        source: r#"(?i)\baws[_-]?secret[_-]?(?:access[_-]?)?key['"]?\s*[:=]\s*['"]?([A-Za-z0-9/+=]{40})"#,
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "gitlab_token",
        label: "GITLAB_TOKEN",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 98,
        source: r"\bglpat-[A-Za-z0-9_-]{20,}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "slack_token",
        label: "SLACK_TOKEN",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 98,
        source: r"\bxox[baprs]-[A-Za-z0-9-]{10,}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "jwt",
        label: "JWT",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 97,
        source: r"\beyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "connection_string",
        label: "CONNECTION_STRING",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 96,
        source: r"(?i)\b(?:postgres(?:ql)?|mysql|mongodb(?:\+srv)?|redis|amqps?)://[^\s@/]+@[^\s]+",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "api_key",
        label: "API_KEY",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 95,
        source: r#"(?i)\b(?:api[_-]?key|apikey|access[_-]?token|auth[_-]?token|secret[_-]?key|client[_-]?secret)['"]?\s*[:=]\s*['"]?([A-Za-z0-9_\-./+]{16,})"#,
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "password_assignment",
        label: "PASSWORD",
        category: PatternCategory::Credential,
        severity: Severity::High,
        priority: 94,
        source: r#"(?i)\b(?:password|passwd|pwd)['"]?\s*[:=]\s*['"]?([^\s'"]{6,})"#,
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "ssn",
        label: "SSN",
        category: PatternCategory::Government,
        severity: Severity::High,
        priority: 85,
        source: r"\b\d{3}-\d{2}-\d{4}\b",
        capture: None,
        validator: Some("not_all_same_digit"),
    },
    BuiltinDef {
        kind: "credit_card",
        label: "CREDIT_CARD",
        category: PatternCategory::Financial,
        severity: Severity::High,
        priority: 84,
        source: r"\b(?:4\d{3}|5[1-5]\d{2}|6011|3[47]\d{2})[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,4}\b",
        capture: None,
        validator: Some("luhn"),
    },
    BuiltinDef {
        kind: "iban",
        label: "IBAN",
        category: PatternCategory::Financial,
        severity: Severity::Medium,
        priority: 82,
        source: r"\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b",
        capture: None,
        validator: Some("iban_mod97"),
    },
    BuiltinDef {
        kind: "passport",
        label: "PASSPORT",
        category: PatternCategory::Government,
        severity: Severity::Medium,
        priority: 78,
        source: r"(?i)\bpassport(?:\s+(?:number|num|no))?\.?\s*[:#]?\s*([A-Z]?\d{7,9})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "drivers_license",
        label: "DRIVERS_LICENSE",
        category: PatternCategory::Government,
        severity: Severity::Medium,
        priority: 77,
        source: r"(?i)\b(?:driver'?s?\s+licen[cs]e|dl)\s*(?:number|num|no|#)?\.?\s*[:#]?\s*([A-Z]{1,2}\d{5,12})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "bank_account",
        label: "BANK_ACCOUNT",
        category: PatternCategory::Financial,
        severity: Severity::Medium,
        priority: 76,
        source: r"(?i)\b(?:bank\s+)?(?:account|acct)\s*(?:number|num|no|#)?\.?\s*[:#]?\s*(\d{8,17})\b",
        capture: Some(1),
        validator: Some("not_all_same_digit"),
    },
    BuiltinDef {
        kind: "routing_number",
        label: "ROUTING_NUMBER",
        category: PatternCategory::Financial,
        severity: Severity::Medium,
        priority: 75,
        source: r"(?i)\b(?:routing|aba)\s*(?:number|num|no|#)?\.?\s*[:#]?\s*(\d{9})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "crypto_address",
        label: "CRYPTO_ADDRESS",
        category: PatternCategory::Financial,
        severity: Severity::Medium,
        priority: 74,
        source: r"\b(?:bc1[a-z0-9]{25,62}|[13][a-km-zA-HJ-NP-Z1-9]{25,34}|0x[a-fA-F0-9]{40})\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "medical_record",
        label: "MEDICAL_RECORD",
        category: PatternCategory::Medical,
        severity: Severity::High,
        priority: 72,
        source: r"(?i)\b(?:mrn|medical\s+record(?:\s+(?:number|num|no))?)\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9-]{4,11})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "npi",
        label: "NPI",
        category: PatternCategory::Medical,
        severity: Severity::Medium,
        priority: 71,
        source: r"(?i)\b(?:npi|national\s+provider\s+identifier)\s*[:#]?\s*(\d{10})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "health_insurance",
        label: "HEALTH_INSURANCE",
        category: PatternCategory::Medical,
        severity: Severity::Medium,
        priority: 70,
        source: r"(?i)\b(?:member|policy|insurance)\s+(?:id|number|num|no)\s*[:#]?\s*([A-Z0-9][A-Z0-9-]{5,14})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "ipv6",
        label: "IPV6",
        category: PatternCategory::Network,
        severity: Severity::Medium,
        priority: 62,
        source: r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b|\b(?:[0-9a-fA-F]{1,4}:){1,6}:(?:[0-9a-fA-F]{1,4}(?::[0-9a-fA-F]{1,4}){0,5})?",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "ipv4",
        label: "IP_ADDRESS",
        category: PatternCategory::Network,
        severity: Severity::Medium,
        priority: 61,
        source: r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
        capture: None,
        validator: Some("ipv4_octets"),
    },
    BuiltinDef {
        kind: "mac_address",
        label: "MAC_ADDRESS",
        category: PatternCategory::Network,
        severity: Severity::Low,
        priority: 58,
        source: r"\b[0-9A-Fa-f]{2}(?:[:-][0-9A-Fa-f]{2}){5}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "url",
        label: "URL",
        category: PatternCategory::Network,
        severity: Severity::Low,
        priority: 55,
        source: r#"\bhttps?://[^\s<>"']+[^\s<>"'.,;:!?)]"#,
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "email",
        label: "EMAIL",
        category: PatternCategory::Contact,
        severity: Severity::Medium,
        priority: 45,
        source: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "phone_us",
        label: "PHONE",
        category: PatternCategory::Contact,
        severity: Severity::Medium,
        priority: 42,
        source: r"\+?1[-.\s]\d{3}[-.\s]\d{3}[-.\s]\d{4}\b|\(\d{3}\)\s*\d{3}[-.\s]\d{4}\b|\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "phone_intl",
        label: "PHONE",
        category: PatternCategory::Contact,
        severity: Severity::Medium,
        priority: 41,
        source: r"\+(?:[2-9]\d{0,2})[-.\s]?(?:\d[-.\s]?){6,11}\d\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "street_address",
        label: "STREET_ADDRESS",
        category: PatternCategory::Identity,
        severity: Severity::Low,
        priority: 38,
        source: r"\b\d{1,5}\s+(?:[A-Z][a-z]+\s+){1,3}(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Place|Pl|Way)\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "date_of_birth",
        label: "DOB",
        category: PatternCategory::Identity,
        severity: Severity::Medium,
        priority: 36,
        source: r"(?i)\b(?:date\s+of\s+birth|birth\s*date|dob|born(?:\s+on)?)\s*[:.]?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{4}-\d{2}-\d{2})\b",
        capture: Some(1),
        validator: Some("plausible_dob"),
    },
    BuiltinDef {
        kind: "person_name",
        label: "NAME",
        category: PatternCategory::Identity,
        severity: Severity::Low,
        priority: 35,
        source: r"\b(?:Mrs|Ms|Mr|Dr|Prof)\.?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "greeting_name",
        label: "NAME",
        category: PatternCategory::Identity,
        severity: Severity::Low,
        priority: 34,
        source: r"\b(?:Dear|Hi|Hello)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "zip_code",
        label: "ZIP_CODE",
        category: PatternCategory::Identity,
        severity: Severity::Low,
        priority: 33,
        source: r"(?i)\b(?:zip|postal)(?:\s+code)?\s*[:.]?\s*(\d{5}(?:-\d{4})?)\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "uuid",
        label: "UUID",
        category: PatternCategory::Identity,
        severity: Severity::Low,
        priority: 25,
        source: r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
        capture: None,
        validator: None,
    },
    BuiltinDef {
        kind: "phone_extension",
        label: "PHONE_EXT",
        category: PatternCategory::Contact,
        severity: Severity::Low,
        priority: 24,
        source: r"(?i)\b(?:ext|extension|x)\.?\s*:?\s*(\d{2,6})\b",
        capture: Some(1),
        validator: None,
    },
    BuiltinDef {
        kind: "generic_number",
        label: "GENERIC_NUMBER",
        category: PatternCategory::Identity,
        severity: Severity::Low,
        priority: 15,
        source: r"\b\d{9,19}\b",
        capture: None,
        validator: Some("not_all_same_digit"),
    },
];

// Compiled once on first use; builtin sources are developer-maintained
// and must compile.
static COMPILED: Lazy<Vec<PatternDescriptor>> = Lazy::new(|| {
    BUILTINS
        .iter()
        .map(|def| PatternDescriptor {
            kind: def.kind.to_string(),
            regex: Regex::new(def.source).unwrap(),
            priority: def.priority,
            label: def.label.to_string(),
            severity: def.severity,
            category: def.category,
            capture: def.capture,
            validator: def.validator.and_then(validators::by_name),
        })
        .collect()
});

/// The built-in descriptors, in registration order.
pub fn builtin_catalog() -> Vec<PatternDescriptor> {
    COMPILED.clone()
}
