//! Fragment protection: which byte ranges of a template must never change.
//!
//! Two mechanisms feed the protected set:
//! - the interpolation scanner, which pairs every `${` with its matching `}`
//!   (brace counting with string, template, and comment awareness), and
//! - pattern rules, regular expressions whose matches are protected verbatim.
//!
//! The built-in patterns carry the guards the original loader needed in
//! practice: a tag-open followed by whitespace, a literal `<=`, and a closing
//! brace followed by a double-quoted attribute value that itself contains
//! interpolation-like text (the case naive brace matching used to lose).

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Tag-start immediately followed by whitespace; guards partial tag openings.
const TAG_START_GAP: &str = r"<\s";

/// Operator-like text that must not be mistaken for markup.
const OPERATOR_LIKE: &str = r"<=";

/// A `"${...".."}"` attribute value with a nested double quote.
const QUOTED_HOLE_ATTRIBUTE: &str = r#""\$\{[^}]+"[^}]+\}""#;

fn builtin_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [TAG_START_GAP, OPERATOR_LIKE, QUOTED_HOLE_ATTRIBUTE]
            .iter()
            .map(|p| Regex::new(p).expect("built-in fragment pattern is valid"))
            .collect()
    })
}

/// Computes the protected byte ranges of `raw`.
///
/// Returns disjoint, sorted ranges; overlapping and adjacent protections are
/// merged. The ranges only describe what must be preserved — nothing is
/// rewritten here.
pub fn protected_spans(raw: &str, custom: &[Regex]) -> Vec<Range<usize>> {
    let mut spans = interpolation_spans(raw);

    for pattern in builtin_patterns().iter().chain(custom.iter()) {
        for m in pattern.find_iter(raw) {
            spans.push(m.start()..m.end());
        }
    }

    merge_spans(spans)
}

/// Finds every `${...}` hole, including its delimiters.
///
/// An unterminated hole protects through to the end of the text.
fn interpolation_spans(raw: &str) -> Vec<Range<usize>> {
    let bytes = raw.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'{' {
            match scan_hole(bytes, i + 2) {
                Some(end) => {
                    spans.push(i..end);
                    i = end;
                }
                None => {
                    spans.push(i..bytes.len());
                    break;
                }
            }
        } else {
            i += 1;
        }
    }

    spans
}

enum Frame {
    /// Inside an expression; tracks brace depth.
    Expr(usize),
    /// Inside a nested template literal.
    Tpl,
}

/// Scans from just past `${` to the matching `}`, returning the exclusive end
/// offset. Strings, nested templates, and comments inside the expression are
/// skipped so braces within them don't count.
fn scan_hole(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack = vec![Frame::Expr(1)];
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        match stack.last_mut()? {
            Frame::Expr(depth) => match b {
                b'{' => *depth += 1,
                b'}' => {
                    *depth -= 1;
                    if *depth == 0 {
                        stack.pop();
                        if stack.is_empty() {
                            return Some(i + 1);
                        }
                    }
                }
                b'\'' | b'"' => {
                    i = skip_string(bytes, i)?;
                    continue;
                }
                b'`' => stack.push(Frame::Tpl),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i += 2;
                    while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                        i += 1;
                    }
                    if i + 1 >= bytes.len() {
                        return None;
                    }
                    i += 2;
                    continue;
                }
                _ => {}
            },
            Frame::Tpl => match b {
                b'`' => {
                    stack.pop();
                }
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    stack.push(Frame::Expr(1));
                    i += 2;
                    continue;
                }
                _ => {}
            },
        }
        i += 1;
    }

    None
}

/// Skips a quoted string starting at `bytes[i]`, returning the offset after
/// the closing quote.
fn skip_string(bytes: &[u8], i: usize) -> Option<usize> {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
    None
}

/// Merges overlapping and adjacent ranges into a sorted disjoint list.
fn merge_spans(mut spans: Vec<Range<usize>>) -> Vec<Range<usize>> {
    spans.sort_by_key(|r| (r.start, r.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => {
                last.end = last.end.max(span.end);
            }
            _ => merged.push(span),
        }
    }
    merged
}
