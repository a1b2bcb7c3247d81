//! Structural vetting of pattern sources before compilation.
//!
//! Rejects pattern shapes known to cause catastrophic backtracking:
//! nested unbounded quantifiers, overlapping alternation under a
//! quantifier, consecutive quantifiers, and backreferences. The regex
//! engine used here runs in linear time, so this gate is primarily for
//! patterns that may be exported to backtracking engines, and it keeps
//! the catalog portable.
//!
//! The scan is shape-level: it tokenizes the source without building a
//! full syntax tree, so it is deliberately conservative. A pattern that
//! passes vetting can still fail real compilation; that error is
//! reported separately.

use thiserror::Error;

/// Longest accepted pattern source, in characters.
pub const MAX_PATTERN_LEN: usize = 5_000;

/// A structural reason a pattern source was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyViolation {
    /// Source exceeds [`MAX_PATTERN_LEN`].
    #[error("source is {len} characters, maximum is {max}")]
    TooLong { len: usize, max: usize },

    /// An unbounded quantifier applied to a group whose body is itself
    /// quantified, e.g. `(a+)+` or `(\w*)*`.
    #[error("nested quantifier near `{fragment}`")]
    NestedQuantifier { fragment: String },

    /// Two quantifiers in a row, e.g. `a++` or `\d+*`.
    #[error("consecutive quantifiers near `{fragment}`")]
    ConsecutiveQuantifiers { fragment: String },

    /// A quantified backreference, e.g. `(\w)\1+`.
    #[error("quantified backreference near `{fragment}`")]
    QuantifiedBackreference { fragment: String },

    /// Any backreference; these do not compile on this engine either.
    #[error("backreference near `{fragment}` is not supported")]
    Backreference { fragment: String },

    /// Alternation branches that can match the same prefix, directly
    /// under an unbounded quantifier, e.g. `(a|ab)+`.
    #[error("overlapping alternation branches near `{fragment}`")]
    OverlappingAlternation { fragment: String },

    /// Unbalanced parentheses.
    #[error("unbalanced group near `{fragment}`")]
    UnbalancedGroup { fragment: String },

    /// Character class with no closing bracket.
    #[error("unclosed character class near `{fragment}`")]
    UnclosedClass { fragment: String },
}

/// One parsed quantifier token.
struct Quant {
    /// `*`, `+`, or `{n,}` with no upper bound.
    unbounded: bool,
    /// Char index just past the quantifier, including a lazy `?`.
    end: usize,
}

/// Open-group bookkeeping while scanning.
struct GroupFrame {
    /// Char index of the opening parenthesis, for fragment reporting.
    open: usize,
    /// A quantifier appears anywhere in the body.
    has_quantifier: bool,
    /// Completed top-level branches of this group.
    branches: Vec<String>,
    /// Char index where the current branch started.
    branch_start: usize,
}

impl GroupFrame {
    fn new(open: usize, body_start: usize) -> Self {
        Self {
            open,
            has_quantifier: false,
            branches: Vec::new(),
            branch_start: body_start,
        }
    }

    fn end_branch(&mut self, chars: &[char], at: usize) {
        let text: String = chars[self.branch_start.min(at)..at].iter().collect();
        self.branches.push(text);
    }
}

/// Check a pattern source for unsafe structure.
pub fn vet_pattern(source: &str) -> Result<(), SafetyViolation> {
    let chars: Vec<char> = source.chars().collect();
    if chars.len() > MAX_PATTERN_LEN {
        return Err(SafetyViolation::TooLong {
            len: chars.len(),
            max: MAX_PATTERN_LEN,
        });
    }

    // Index 0 is a virtual frame for the top level.
    let mut stack: Vec<GroupFrame> = vec![GroupFrame::new(0, 0)];
    let mut after_quantifier = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if let Some(d) = chars.get(i + 1) {
                    if d.is_ascii_digit() && *d != '0' {
                        return Err(if parse_quantifier(&chars, i + 2).is_some() {
                            SafetyViolation::QuantifiedBackreference {
                                fragment: fragment(&chars, i),
                            }
                        } else {
                            SafetyViolation::Backreference {
                                fragment: fragment(&chars, i),
                            }
                        });
                    }
                }
                after_quantifier = false;
                i += 2;
            }
            '[' => {
                i = skip_class(&chars, i)?;
                after_quantifier = false;
            }
            '(' => match group_start(&chars, i)? {
                GroupStart::Body(body) => {
                    stack.push(GroupFrame::new(i, body));
                    after_quantifier = false;
                    i = body;
                }
                GroupStart::FlagsOnly(end) => {
                    after_quantifier = false;
                    i = end;
                }
            },
            ')' => {
                if stack.len() == 1 {
                    return Err(SafetyViolation::UnbalancedGroup {
                        fragment: fragment(&chars, i),
                    });
                }
                let mut frame = stack.pop().unwrap_or_else(|| GroupFrame::new(0, 0));
                frame.end_branch(&chars, i);

                if let Some(q) = parse_quantifier(&chars, i + 1) {
                    if q.unbounded {
                        if frame.has_quantifier {
                            return Err(SafetyViolation::NestedQuantifier {
                                fragment: fragment(&chars, frame.open),
                            });
                        }
                        if frame.branches.len() > 1 && branches_overlap(&frame.branches) {
                            return Err(SafetyViolation::OverlappingAlternation {
                                fragment: fragment(&chars, frame.open),
                            });
                        }
                    }
                    if let Some(parent) = stack.last_mut() {
                        parent.has_quantifier = true;
                    }
                    after_quantifier = true;
                    i = q.end;
                } else {
                    if frame.has_quantifier {
                        if let Some(parent) = stack.last_mut() {
                            parent.has_quantifier = true;
                        }
                    }
                    after_quantifier = false;
                    i += 1;
                }
            }
            '|' => {
                if let Some(frame) = stack.last_mut() {
                    frame.end_branch(&chars, i);
                    frame.branch_start = i + 1;
                }
                after_quantifier = false;
                i += 1;
            }
            _ => {
                if let Some(q) = parse_quantifier(&chars, i) {
                    if after_quantifier {
                        return Err(SafetyViolation::ConsecutiveQuantifiers {
                            fragment: fragment(&chars, i),
                        });
                    }
                    if let Some(frame) = stack.last_mut() {
                        frame.has_quantifier = true;
                    }
                    after_quantifier = true;
                    i = q.end;
                } else {
                    after_quantifier = false;
                    i += 1;
                }
            }
        }
    }

    if stack.len() != 1 {
        let open = stack.last().map(|f| f.open).unwrap_or(0);
        return Err(SafetyViolation::UnbalancedGroup {
            fragment: fragment(&chars, open),
        });
    }
    Ok(())
}

/// How a `(` token continues.
enum GroupStart {
    /// A real group; body starts at this index.
    Body(usize),
    /// Inline flags with no body, e.g. `(?im)`; token ends at this index.
    FlagsOnly(usize),
}

fn group_start(chars: &[char], open: usize) -> Result<GroupStart, SafetyViolation> {
    if chars.get(open + 1) != Some(&'?') {
        return Ok(GroupStart::Body(open + 1));
    }
    match chars.get(open + 2) {
        Some(':') => Ok(GroupStart::Body(open + 3)),
        Some('=') | Some('!') => Ok(GroupStart::Body(open + 3)),
        Some('P') => match chars.get(open + 3) {
            // (?P=name) is a named backreference
            Some('=') => Err(SafetyViolation::Backreference {
                fragment: fragment(chars, open),
            }),
            Some('<') => Ok(GroupStart::Body(skip_to(chars, open + 4, '>'))),
            _ => Ok(GroupStart::Body(open + 3)),
        },
        Some('<') => match chars.get(open + 3) {
            Some('=') | Some('!') => Ok(GroupStart::Body(open + 4)),
            _ => Ok(GroupStart::Body(skip_to(chars, open + 4, '>'))),
        },
        _ => {
            // Inline flags: (?i), (?im), (?i:...), (?-s:...)
            let mut j = open + 2;
            while j < chars.len() && (chars[j].is_ascii_alphabetic() || chars[j] == '-') {
                j += 1;
            }
            match chars.get(j) {
                Some(':') => Ok(GroupStart::Body(j + 1)),
                Some(')') => Ok(GroupStart::FlagsOnly(j + 1)),
                _ => Ok(GroupStart::Body(j)),
            }
        }
    }
}

/// Advance past `target`, or to end of input.
fn skip_to(chars: &[char], from: usize, target: char) -> usize {
    let mut j = from;
    while j < chars.len() && chars[j] != target {
        j += 1;
    }
    (j + 1).min(chars.len() + 1)
}

/// Skip a character class starting at `[`. Returns the index past `]`.
fn skip_class(chars: &[char], open: usize) -> Result<usize, SafetyViolation> {
    let mut j = open + 1;
    if chars.get(j) == Some(&'^') {
        j += 1;
    }
    // A `]` in first position is a literal member.
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            ']' => return Ok(j + 1),
            _ => j += 1,
        }
    }
    Err(SafetyViolation::UnclosedClass {
        fragment: fragment(chars, open),
    })
}

/// Parse a quantifier at `i`: `*`, `+`, `?`, or `{m}` / `{m,}` / `{m,n}`,
/// each with an optional lazy `?` suffix.
fn parse_quantifier(chars: &[char], i: usize) -> Option<Quant> {
    let (unbounded, mut end) = match chars.get(i)? {
        '*' | '+' => (true, i + 1),
        '?' => (false, i + 1),
        '{' => {
            let mut j = i + 1;
            let digits_start = j;
            while chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                j += 1;
            }
            if j == digits_start {
                return None;
            }
            match chars.get(j) {
                Some('}') => (false, j + 1),
                Some(',') => {
                    let upper_start = j + 1;
                    let mut k = upper_start;
                    while chars.get(k).is_some_and(|c| c.is_ascii_digit()) {
                        k += 1;
                    }
                    if chars.get(k) == Some(&'}') {
                        (k == upper_start, k + 1)
                    } else {
                        return None;
                    }
                }
                _ => return None,
            }
        }
        _ => return None,
    };
    // Lazy marker belongs to this quantifier.
    if chars.get(end) == Some(&'?') {
        end += 1;
    }
    Some(Quant { unbounded, end })
}

/// True when any branch duplicates another or is a prefix of it. An
/// empty branch overlaps everything.
fn branches_overlap(branches: &[String]) -> bool {
    for (i, a) in branches.iter().enumerate() {
        if a.is_empty() {
            return true;
        }
        for (j, b) in branches.iter().enumerate() {
            if i != j && (a == b || b.starts_with(a.as_str())) {
                return true;
            }
        }
    }
    false
}

/// Short snippet around a position for error messages.
fn fragment(chars: &[char], pos: usize) -> String {
    let start = pos.saturating_sub(4);
    let end = (pos + 12).min(chars.len());
    chars[start..end].iter().collect()
}
