//! The mask / minify / restore engine.
//!
//! Protected ranges are replaced with placeholder markers, the masked text is
//! lexed into tags, comments, raw-text blocks, and text runs, whitespace and
//! comments are reduced, and the markers are restored verbatim. Tag internals
//! (attributes) are copied byte-for-byte: attribute values legally contain
//! `${...}` and must never be escaped or re-quoted.

use crate::{fragment, MinifyError, MinifyOptions};
use std::ops::Range;

/// A protected fragment carried through minification, with its position in
/// the input and in the minified output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preserved {
    /// Byte range in the minified output.
    pub output: Range<usize>,
    /// Byte range in the input text.
    pub input: Range<usize>,
}

/// The result of [`minify_tracked`].
#[derive(Debug, Clone)]
pub struct MinifyOutput {
    /// The minified text.
    pub text: String,
    /// Every protected fragment, in order of appearance.
    pub preserved: Vec<Preserved>,
}

/// Minifies template markup, leaving protected fragments untouched.
pub fn minify(raw: &str, options: &MinifyOptions) -> Result<String, MinifyError> {
    minify_tracked(raw, options).map(|out| out.text)
}

/// Minifies template markup and reports where each protected fragment landed
/// in the output, for source-map construction.
pub fn minify_tracked(raw: &str, options: &MinifyOptions) -> Result<MinifyOutput, MinifyError> {
    let spans = fragment::protected_spans(raw, &options.ignore_custom_fragments);
    let marker = Marker::for_text(raw);

    let mut masked = String::with_capacity(raw.len());
    let mut cursor = 0;
    for (idx, span) in spans.iter().enumerate() {
        masked.push_str(&raw[cursor..span.start]);
        masked.push_str(&marker.render(idx));
        cursor = span.end;
    }
    masked.push_str(&raw[cursor..]);

    let tokens = lex(&masked, options.case_sensitive)?;
    let mini = render(&tokens, options, &marker);

    // Restore the protected fragments, recording output positions.
    let mut text = String::with_capacity(mini.len());
    let mut preserved = Vec::with_capacity(spans.len());
    let mut rest = mini.as_str();
    for (idx, span) in spans.iter().enumerate() {
        let token = marker.render(idx);
        let Some(pos) = rest.find(&token) else {
            return Err(MinifyError::MissingFragment { index: idx });
        };
        text.push_str(&rest[..pos]);
        let start = text.len();
        text.push_str(&raw[span.clone()]);
        preserved.push(Preserved {
            output: start..text.len(),
            input: span.clone(),
        });
        rest = &rest[pos + token.len()..];
    }
    text.push_str(rest);

    Ok(MinifyOutput { text, preserved })
}

/// Placeholder delimiters chosen so they cannot collide with the input: one
/// more repetition of the private-use delimiter than the longest run already
/// present.
struct Marker {
    open: String,
    close: String,
}

impl Marker {
    const OPEN: char = '\u{E000}';
    const CLOSE: char = '\u{E001}';

    fn for_text(text: &str) -> Self {
        let mut run = 0usize;
        let mut longest = 0usize;
        for c in text.chars() {
            if c == Self::OPEN || c == Self::CLOSE {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
        let n = longest + 1;
        Self {
            open: Self::OPEN.to_string().repeat(n),
            close: Self::CLOSE.to_string().repeat(n),
        }
    }

    fn render(&self, idx: usize) -> String {
        format!("{}{}{}", self.open, idx, self.close)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawKind {
    /// Content copied verbatim (`pre`, `textarea`, `script`).
    Verbatim,
    /// `<style>` content; collapsed only when `minify_css` is set.
    Style,
}

#[derive(Debug)]
enum Token<'a> {
    Text(&'a str),
    Comment(&'a str),
    Tag(&'a str),
    RawText { kind: RawKind, content: &'a str },
}

fn is_html_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn lex(input: &str, case_sensitive: bool) -> Result<Vec<Token<'_>>, MinifyError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut text_start = 0;

    macro_rules! flush_text {
        () => {
            if text_start < i {
                tokens.push(Token::Text(&input[text_start..i]));
            }
        };
    }

    while i < bytes.len() {
        if bytes[i] == b'<' && i + 1 < bytes.len() {
            let next = bytes[i + 1];

            if input[i..].starts_with("<!--") {
                flush_text!();
                let Some(rel) = input[i..].find("-->") else {
                    return Err(MinifyError::UnclosedComment { at: i });
                };
                let end = i + rel + 3;
                tokens.push(Token::Comment(&input[i..end]));
                i = end;
                text_start = i;
                continue;
            }

            let close_tag = next == b'/'
                && bytes
                    .get(i + 2)
                    .is_some_and(|b| b.is_ascii_alphabetic());
            if next.is_ascii_alphabetic() || close_tag || next == b'!' || next == b'?' {
                flush_text!();
                let end = scan_tag(bytes, i)?;
                let tag = &input[i..end];
                tokens.push(Token::Tag(tag));
                i = end;
                text_start = i;

                if let Some(name) = open_tag_name(tag) {
                    if let Some(kind) = raw_text_kind(name, case_sensitive) {
                        let content_end = find_raw_close(bytes, i, name, case_sensitive);
                        if content_end > i {
                            tokens.push(Token::RawText {
                                kind,
                                content: &input[i..content_end],
                            });
                        }
                        i = content_end;
                        text_start = i;
                    }
                }
                continue;
            }
        }
        i += 1;
    }
    flush_text!();

    Ok(tokens)
}

/// Scans a tag from its `<` to just past its `>`, honoring quoted attribute
/// values so a `>` inside one does not end the tag.
fn scan_tag(bytes: &[u8], start: usize) -> Result<usize, MinifyError> {
    let mut i = start + 1;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        match quote {
            Some(q) => {
                if bytes[i] == q {
                    quote = None;
                }
            }
            None => match bytes[i] {
                b'"' | b'\'' => quote = Some(bytes[i]),
                b'>' => return Ok(i + 1),
                _ => {}
            },
        }
        i += 1;
    }
    Err(MinifyError::UnclosedTag { at: start })
}

/// Returns the element name of an opening, non-self-closing tag.
fn open_tag_name(tag: &str) -> Option<&str> {
    let rest = tag.strip_prefix('<')?;
    if rest.starts_with('/') {
        return None;
    }
    if tag.ends_with("/>") {
        return None;
    }
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}

fn raw_text_kind(name: &str, case_sensitive: bool) -> Option<RawKind> {
    let is = |elem: &str| {
        if case_sensitive {
            name == elem
        } else {
            name.eq_ignore_ascii_case(elem)
        }
    };
    if is("pre") || is("textarea") || is("script") {
        Some(RawKind::Verbatim)
    } else if is("style") {
        Some(RawKind::Style)
    } else {
        None
    }
}

/// Finds the start of `</name` terminating a raw-text element, or the end of
/// input if the element is never closed.
fn find_raw_close(bytes: &[u8], from: usize, name: &str, case_sensitive: bool) -> usize {
    let name = name.as_bytes();
    let mut i = from;
    while i + 2 + name.len() <= bytes.len() {
        if bytes[i] == b'<' && bytes[i + 1] == b'/' {
            let cand = &bytes[i + 2..i + 2 + name.len()];
            let matches = if case_sensitive {
                cand == name
            } else {
                cand.eq_ignore_ascii_case(name)
            };
            if matches {
                let boundary = bytes.get(i + 2 + name.len()).copied();
                if boundary.is_none()
                    || matches!(boundary, Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r'))
                {
                    return i;
                }
            }
        }
        i += 1;
    }
    bytes.len()
}

/// What the renderer last emitted, for whitespace-run context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Solid {
    /// Start or end of the template.
    Boundary,
    /// A tag, kept comment, or other non-text node.
    Tag,
    /// Text content (including protected-fragment markers).
    Text,
}

struct Renderer<'a> {
    out: String,
    options: &'a MinifyOptions,
    prev: Solid,
    /// Raw whitespace seen since the last solid emission.
    pending_ws: String,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a MinifyOptions) -> Self {
        Self {
            out: String::new(),
            options,
            prev: Solid::Boundary,
            pending_ws: String::new(),
        }
    }

    fn note_ws(&mut self, ws: &str) {
        self.pending_ws.push_str(ws);
    }

    fn emit(&mut self, text: &str, kind: Solid) {
        self.resolve_pending(kind);
        self.out.push_str(text);
        self.prev = kind;
    }

    fn finish(mut self) -> String {
        self.resolve_pending(Solid::Boundary);
        self.out
    }

    fn resolve_pending(&mut self, next: Solid) {
        if self.pending_ws.is_empty() {
            return;
        }
        let opts = self.options;
        if !opts.collapse_whitespace {
            let ws = std::mem::take(&mut self.pending_ws);
            self.out.push_str(&ws);
            return;
        }

        let had_newline = self.pending_ws.contains('\n');
        let between_tags = self.prev != Solid::Text && next != Solid::Text;
        self.pending_ws.clear();

        if opts.preserve_line_breaks && had_newline {
            self.out.push('\n');
        } else if between_tags && (had_newline || !opts.conservative_collapse) {
            // Formatting-only whitespace: removed outright.
        } else {
            self.out.push(' ');
        }
    }
}

fn render(tokens: &[Token<'_>], options: &MinifyOptions, marker: &Marker) -> String {
    let mut r = Renderer::new(options);

    for token in tokens {
        match token {
            Token::Text(text) => {
                let mut rest = *text;
                while !rest.is_empty() {
                    let first_is_ws = rest.starts_with(is_html_ws);
                    let split = rest
                        .find(|c: char| is_html_ws(c) != first_is_ws)
                        .unwrap_or(rest.len());
                    let (chunk, tail) = rest.split_at(split);
                    if chunk.starts_with(is_html_ws) {
                        r.note_ws(chunk);
                    } else {
                        r.emit(chunk, Solid::Text);
                    }
                    rest = tail;
                }
            }
            Token::Comment(comment) => {
                let keep = !options.remove_comments || comment.contains(marker.open.as_str());
                if keep {
                    r.emit(comment, Solid::Tag);
                }
            }
            Token::Tag(tag) => {
                r.emit(tag, Solid::Tag);
            }
            Token::RawText { kind, content } => {
                if *kind == RawKind::Style && options.minify_css {
                    let collapsed = collapse_style(content);
                    r.emit(&collapsed, Solid::Text);
                } else {
                    r.emit(content, Solid::Text);
                }
            }
        }
    }

    r.finish()
}

/// Collapses whitespace runs in style content to single spaces, trimming the
/// edges. Fragment markers inside the content pass through as ordinary text.
fn collapse_style(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_run = false;
    for c in content.chars() {
        if is_html_ws(c) {
            in_run = true;
        } else {
            if in_run && !out.is_empty() {
                out.push(' ');
            }
            in_run = false;
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mini(raw: &str) -> String {
        minify(raw, &MinifyOptions::default()).unwrap()
    }

    #[test]
    fn test_collapse_between_tags() {
        assert_eq!(
            mini("<div>\n  <span>${\"x\"}</span>\n</div>"),
            "<div><span>${\"x\"}</span></div>"
        );
    }

    #[test]
    fn test_conservative_keeps_same_line_space() {
        assert_eq!(mini("<b>a</b> <b>c</b>"), "<b>a</b> <b>c</b>");
    }

    #[test]
    fn test_aggressive_removes_same_line_space() {
        let options = MinifyOptions {
            conservative_collapse: false,
            ..Default::default()
        };
        assert_eq!(
            minify("<b>a</b> <b>c</b>", &options).unwrap(),
            "<b>a</b><b>c</b>"
        );
    }

    #[test]
    fn test_text_runs_collapse_to_single_space() {
        assert_eq!(mini("<p>a   \n  b</p>"), "<p>a b</p>");
    }

    #[test]
    fn test_whitespace_around_hole_is_inline_significant() {
        assert_eq!(mini("<div> ${x} </div>"), "<div> ${x} </div>");
    }

    #[test]
    fn test_comment_stripped() {
        assert_eq!(mini("<div><!-- note --><p>x</p></div>"), "<div><p>x</p></div>");
    }

    #[test]
    fn test_comment_with_hole_kept() {
        assert_eq!(
            mini("<div><!-- ${flag} --></div>"),
            "<div><!-- ${flag} --></div>"
        );
    }

    #[test]
    fn test_comments_kept_when_disabled() {
        let options = MinifyOptions {
            remove_comments: false,
            ..Default::default()
        };
        assert_eq!(
            minify("<div><!-- note --></div>", &options).unwrap(),
            "<div><!-- note --></div>"
        );
    }

    #[test]
    fn test_pre_content_preserved() {
        assert_eq!(
            mini("<pre>\n  keep   this\n</pre>"),
            "<pre>\n  keep   this\n</pre>"
        );
    }

    #[test]
    fn test_uppercase_pre_not_raw_when_case_sensitive() {
        // Not recognized as a raw-text element, so its whitespace is
        // inline-significant and collapses to single spaces.
        assert_eq!(mini("<PRE>\n  a\n</PRE>"), "<PRE> a </PRE>");

        let options = MinifyOptions {
            case_sensitive: false,
            ..Default::default()
        };
        assert_eq!(
            minify("<PRE>\n  a\n</PRE>", &options).unwrap(),
            "<PRE>\n  a\n</PRE>"
        );
    }

    #[test]
    fn test_style_untouched_by_default() {
        assert_eq!(
            mini("<style>\n  p {\n    color: ${color};\n  }\n</style>"),
            "<style>\n  p {\n    color: ${color};\n  }\n</style>"
        );
    }

    #[test]
    fn test_minify_css_collapses_style() {
        let options = MinifyOptions {
            minify_css: true,
            ..Default::default()
        };
        assert_eq!(
            minify("<style>\n  p {\n    color: red;\n  }\n</style>", &options).unwrap(),
            "<style>p { color: red; }</style>"
        );
    }

    #[test]
    fn test_preserve_line_breaks() {
        let options = MinifyOptions {
            preserve_line_breaks: true,
            ..Default::default()
        };
        assert_eq!(
            minify("<div>\n  <span>a</span>\n</div>", &options).unwrap(),
            "<div>\n<span>a</span>\n</div>"
        );
    }

    #[test]
    fn test_collapse_disabled_keeps_whitespace() {
        let options = MinifyOptions {
            collapse_whitespace: false,
            ..Default::default()
        };
        assert_eq!(
            minify("<div>\n  <p>a</p>\n</div>", &options).unwrap(),
            "<div>\n  <p>a</p>\n</div>"
        );
    }

    #[test]
    fn test_attribute_internals_untouched() {
        assert_eq!(
            mini("<input   .value=\"${v}\"  ?disabled=\"${d}\">"),
            "<input   .value=\"${v}\"  ?disabled=\"${d}\">"
        );
    }

    #[test]
    fn test_gt_inside_quoted_attribute() {
        assert_eq!(mini("<a title=\"a > b\">x</a>"), "<a title=\"a > b\">x</a>");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<div>\n  <span>${\"x\"}</span>\n</div>",
            "<b>a</b> <b>c</b>",
            "<p>a   b</p> ",
            "<pre> x </pre>",
        ];
        for input in inputs {
            let once = mini(input);
            assert_eq!(mini(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_unclosed_comment_errors() {
        assert_eq!(
            minify("<div><!-- oops", &MinifyOptions::default()),
            Err(MinifyError::UnclosedComment { at: 5 })
        );
    }

    #[test]
    fn test_unclosed_tag_errors() {
        assert_eq!(
            minify("<div a=\"x>", &MinifyOptions::default()),
            Err(MinifyError::UnclosedTag { at: 0 })
        );
    }

    #[test]
    fn test_tracked_positions() {
        let raw = "<div>\n  <span>${\"x\"}</span>\n</div>";
        let out = minify_tracked(raw, &MinifyOptions::default()).unwrap();
        assert_eq!(out.text, "<div><span>${\"x\"}</span></div>");
        assert_eq!(out.preserved.len(), 1);

        let p = &out.preserved[0];
        assert_eq!(&raw[p.input.clone()], "${\"x\"}");
        assert_eq!(&out.text[p.output.clone()], "${\"x\"}");
    }

    #[test]
    fn test_hole_bytes_never_altered() {
        let raw = "<ul>\n  ${items.map(i => `<li>  ${i}  </li>`)}\n</ul>";
        let out = mini(raw);
        assert!(out.contains("${items.map(i => `<li>  ${i}  </li>`)}"));
    }

    #[test]
    fn test_marker_collision_input() {
        // Input already containing the private-use delimiter round-trips.
        let raw = "<p>\u{E000}0\u{E001} ${x}</p>";
        let out = mini(raw);
        assert!(out.contains("\u{E000}0\u{E001}"));
        assert!(out.contains("${x}"));
    }

    #[test]
    fn test_doctype_is_a_tag() {
        assert_eq!(mini("<!DOCTYPE html>\n<html></html>"), "<!DOCTYPE html><html></html>");
    }
}
