//! Rewriting matched templates into an explicit edit plan.
//!
//! Instead of mutating syntax-tree nodes (and risking stale end offsets), the
//! rewrite step produces an ordered list of [`Edit`]s over the original text.
//! Every downstream offset is derived from the actual minified text length.
//!
//! Templates nested inside another template's dynamic hole are composed
//! bottom-up: a child's minified text is spliced into its parent's raw text
//! before the parent is minified, so each top-level edit carries its fully
//! minified subtree. Anchors track where preserved fragments landed, in
//! original-text coordinates, through every level of splicing.

use crate::locate::TemplateMatch;
use markup_minifier::{minify_tracked, MinifyError, MinifyOptions};
use source_map::Span;
use std::ops::Range;

/// A byte range of an edit's replacement that is identical to a span of the
/// original source (a preserved dynamic hole, possibly from a nested match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Range in the replacement text.
    pub output: Range<usize>,
    /// The original-source span it reproduces byte-for-byte.
    pub original: Span,
}

/// A single replacement of an original span with minified text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// The inner template span being replaced.
    pub span: Span,
    /// The minified text to splice in.
    pub replacement: String,
    /// Preserved fragments within the replacement, in output order.
    pub anchors: Vec<Anchor>,
}

/// Minifies every match and produces the top-level edit plan: sorted,
/// non-overlapping, with nested matches folded into their ancestors.
pub fn rewrite(
    text: &str,
    matches: &[TemplateMatch],
    options: &MinifyOptions,
) -> Result<Vec<Edit>, MinifyError> {
    let mut edits = Vec::new();
    let mut i = 0;
    while i < matches.len() {
        let span = matches[i].span;
        let (replacement, anchors) = minify_subtree(text, matches, i, options)?;
        edits.push(Edit {
            span,
            replacement,
            anchors,
        });
        i = end_of_subtree(matches, i);
    }
    Ok(edits)
}

/// Index just past the subtree rooted at `i` (matches are sorted by start and
/// properly nested, so a subtree is a contiguous run).
fn end_of_subtree(matches: &[TemplateMatch], i: usize) -> usize {
    let span = matches[i].span;
    let mut k = i + 1;
    while k < matches.len() && matches[k].span.start < span.end {
        k += 1;
    }
    k
}

/// A segment of the effective (child-spliced) raw text of a match.
enum Seg<'a> {
    /// Copied from the original text.
    Verbatim {
        eff: Range<usize>,
        orig_start: usize,
    },
    /// A child match's minified replacement.
    Child {
        eff: Range<usize>,
        anchors: &'a [Anchor],
    },
}

/// Minifies `matches[i]` with all of its nested matches already applied.
///
/// Returns the minified text and its anchors, with anchor spans already in
/// original-text coordinates.
fn minify_subtree(
    text: &str,
    matches: &[TemplateMatch],
    i: usize,
    options: &MinifyOptions,
) -> Result<(String, Vec<Anchor>), MinifyError> {
    let m = &matches[i];
    let base = u32::from(m.span.start) as usize;
    let raw = &text[m.span.to_range()];

    // Minify direct children first and splice them into this match's raw
    // text, tracking which effective ranges came from where.
    let mut children: Vec<(Span, String, Vec<Anchor>)> = Vec::new();
    let mut j = i + 1;
    while j < matches.len() && matches[j].span.start < m.span.end {
        let (child_text, child_anchors) = minify_subtree(text, matches, j, options)?;
        children.push((matches[j].span, child_text, child_anchors));
        j = end_of_subtree(matches, j);
    }

    let mut eff = String::with_capacity(raw.len());
    let mut segments: Vec<Seg<'_>> = Vec::new();
    let mut cursor = 0usize;
    for (child_span, child_text, child_anchors) in &children {
        let rel_start = u32::from(child_span.start) as usize - base;
        let rel_end = u32::from(child_span.end) as usize - base;
        if rel_start > cursor {
            segments.push(Seg::Verbatim {
                eff: eff.len()..eff.len() + (rel_start - cursor),
                orig_start: base + cursor,
            });
            eff.push_str(&raw[cursor..rel_start]);
        }
        segments.push(Seg::Child {
            eff: eff.len()..eff.len() + child_text.len(),
            anchors: child_anchors,
        });
        eff.push_str(child_text);
        cursor = rel_end;
    }
    if cursor < raw.len() {
        segments.push(Seg::Verbatim {
            eff: eff.len()..eff.len() + (raw.len() - cursor),
            orig_start: base + cursor,
        });
        eff.push_str(&raw[cursor..]);
    }

    let out = minify_tracked(&eff, options)?;

    // Translate each preserved fragment back to original coordinates, split
    // along the segments it covers. Rewritten child markup inside a hole gets
    // no anchor; only byte-identical stretches do.
    let mut anchors = Vec::new();
    for p in &out.preserved {
        for seg in &segments {
            match seg {
                Seg::Verbatim { eff, orig_start } => {
                    let a = p.input.start.max(eff.start);
                    let b = p.input.end.min(eff.end);
                    if a >= b {
                        continue;
                    }
                    let orig_a = orig_start + (a - eff.start);
                    anchors.push(Anchor {
                        output: p.output.start + (a - p.input.start)
                            ..p.output.start + (b - p.input.start),
                        original: Span::new(orig_a as u32, (orig_a + (b - a)) as u32),
                    });
                }
                Seg::Child {
                    eff,
                    anchors: child_anchors,
                } => {
                    for ca in *child_anchors {
                        let ca_eff = eff.start + ca.output.start..eff.start + ca.output.end;
                        let a = p.input.start.max(ca_eff.start);
                        let b = p.input.end.min(ca_eff.end);
                        if a >= b {
                            continue;
                        }
                        let orig_a =
                            u32::from(ca.original.start) as usize + (a - ca_eff.start);
                        anchors.push(Anchor {
                            output: p.output.start + (a - p.input.start)
                                ..p.output.start + (b - p.input.start),
                            original: Span::new(orig_a as u32, (orig_a + (b - a)) as u32),
                        });
                    }
                }
            }
        }
    }
    anchors.sort_by_key(|a| a.output.start);

    Ok((out.text, anchors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate;
    use crate::parse::{parse, ParserOptions};
    use crate::DEFAULT_TAG;
    use pretty_assertions::assert_eq;

    fn plan(source: &str) -> Vec<Edit> {
        let parsed = parse(source, &ParserOptions::default()).unwrap();
        let matches = locate(&parsed, source, DEFAULT_TAG);
        rewrite(source, &matches, &MinifyOptions::default()).unwrap()
    }

    #[test]
    fn test_single_edit() {
        let source = "const t = html`<div>\n  <span>${\"x\"}</span>\n</div>`;";
        let edits = plan(source);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].replacement, "<div><span>${\"x\"}</span></div>");
        assert_eq!(&source[edits[0].span.to_range()], "<div>\n  <span>${\"x\"}</span>\n</div>");
    }

    #[test]
    fn test_anchor_points_at_original_hole() {
        let source = "const t = html`<div>\n  <span>${\"x\"}</span>\n</div>`;";
        let edits = plan(source);
        let anchors = &edits[0].anchors;
        assert_eq!(anchors.len(), 1);
        assert_eq!(&edits[0].replacement[anchors[0].output.clone()], "${\"x\"}");
        assert_eq!(&source[anchors[0].original.to_range()], "${\"x\"}");
    }

    #[test]
    fn test_independent_templates_two_edits() {
        let source = "const a = html`<p>\n x</p>`; const b = html`<i>\n y</i>`;";
        let edits = plan(source);
        assert_eq!(edits.len(), 2);
        assert!(edits[0].span.end <= edits[1].span.start);
        assert_eq!(edits[0].replacement, "<p> x</p>");
        assert_eq!(edits[1].replacement, "<i> y</i>");
    }

    #[test]
    fn test_nested_template_composed_into_one_edit() {
        let source = "const t = html`<ul>\n  ${xs.map(x => html`<li>\n  ${x}\n</li>`)}\n</ul>`;";
        let edits = plan(source);
        assert_eq!(edits.len(), 1);
        // The child `<li>` template is minified inside the outer hole.
        assert_eq!(
            edits[0].replacement,
            "<ul> ${xs.map(x => html`<li> ${x} </li>`)} </ul>"
        );
    }

    #[test]
    fn test_nested_anchor_reaches_innermost_hole() {
        let source = "const t = html`<ul>${xs.map(x => html`<li>${x}</li>`)}</ul>`;";
        let edits = plan(source);
        assert_eq!(edits.len(), 1);

        // Every anchor reproduces its original bytes.
        for anchor in &edits[0].anchors {
            assert_eq!(
                &edits[0].replacement[anchor.output.clone()],
                &source[anchor.original.to_range()],
            );
        }
        // The innermost hole `${x}` is among the anchored stretches.
        assert!(edits[0]
            .anchors
            .iter()
            .any(|a| &source[a.original.to_range()] == "${x}"));
    }

    #[test]
    fn test_edits_sorted_disjoint_in_bounds() {
        let source = "const a = html`<p>${1}</p>`;\nconst b = html`<ul>${xs.map(x => html`<li>${x}</li>`)}</ul>`;\n";
        let edits = plan(source);
        let mut cursor = 0u32;
        for edit in &edits {
            assert!(u32::from(edit.span.start) >= cursor);
            assert!(u32::from(edit.span.end) <= source.len() as u32);
            cursor = edit.span.end.into();
        }
    }

    #[test]
    fn test_empty_match_list_yields_no_edits() {
        let edits = rewrite("const x = 1;", &[], &MinifyOptions::default()).unwrap();
        assert!(edits.is_empty());
    }
}
