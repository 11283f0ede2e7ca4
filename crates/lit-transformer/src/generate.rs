//! Code and source-map generation.
//!
//! Splices the edit plan into the original text: output is byte-identical to
//! the original outside the edited spans and equal to the minified text
//! inside them. Verbatim stretches and preserved holes become exact mappings;
//! minified markup becomes rewritten mappings pointing at the span it
//! replaced.

use crate::rewrite::Edit;
use crate::SourceUnit;
use source_map::{SourceMap, SourceMapBuilder, Span};
use thiserror::Error;

/// The edit plan could not be applied to the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// An edit fell outside the text or overlapped a preceding edit.
    #[error("edit span {start}..{end} is out of bounds or overlaps a preceding edit")]
    InvalidEdit {
        /// Start offset of the offending edit.
        start: u32,
        /// End offset of the offending edit.
        end: u32,
    },
}

/// Applies `edits` to the unit's text, producing the generated code and the
/// span map relating it to the original.
///
/// With zero edits this degenerates to the original text under an identity
/// mapping.
pub fn generate(unit: &SourceUnit, edits: &[Edit]) -> Result<(String, SourceMap), GenerateError> {
    let text = &unit.text;
    let mut code = String::with_capacity(text.len());
    let mut builder = SourceMapBuilder::new();
    let mut cursor = 0usize;

    for edit in edits {
        let range = edit.span.to_range();
        if range.start < cursor || range.end > text.len() || range.start > range.end {
            return Err(GenerateError::InvalidEdit {
                start: edit.span.start.into(),
                end: edit.span.end.into(),
            });
        }

        let gap = &text[cursor..range.start];
        builder.add_source((cursor as u32).into(), gap);
        code.push_str(gap);

        // Interleave rewritten stretches with exact anchors. Stretches after
        // an anchor map to the original region following that hole.
        let mut out_pos = 0usize;
        let mut orig_pos = edit.span.start;
        for anchor in &edit.anchors {
            if anchor.output.start > out_pos {
                let chunk = &edit.replacement[out_pos..anchor.output.start];
                builder.add_rewritten(Span::new(orig_pos, edit.span.end), chunk);
                code.push_str(chunk);
            }
            builder.add_exact(anchor.original);
            code.push_str(&edit.replacement[anchor.output.clone()]);
            out_pos = anchor.output.end;
            orig_pos = anchor.original.end;
        }
        if out_pos < edit.replacement.len() {
            let chunk = &edit.replacement[out_pos..];
            builder.add_rewritten(Span::new(orig_pos, edit.span.end), chunk);
            code.push_str(chunk);
        }

        cursor = range.end;
    }

    let tail = &text[cursor..];
    builder.add_source((cursor as u32).into(), tail);
    code.push_str(tail);

    Ok((code, builder.build()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate;
    use crate::parse::{parse, ParserOptions};
    use crate::rewrite::rewrite;
    use crate::{MinifyOptions, DEFAULT_TAG};
    use pretty_assertions::assert_eq;
    use text_size::TextSize;

    fn run(source: &str) -> (String, SourceMap) {
        let parsed = parse(source, &ParserOptions::default()).unwrap();
        let matches = locate(&parsed, source, DEFAULT_TAG);
        let edits = rewrite(source, &matches, &MinifyOptions::default()).unwrap();
        generate(&SourceUnit::new("test.ts", source), &edits).unwrap()
    }

    /// Offset of `needle` in `text`.
    fn offset_of(text: &str, needle: &str) -> u32 {
        text.find(needle).unwrap_or_else(|| panic!("{needle:?} not found")) as u32
    }

    #[test]
    fn test_zero_edits_identity() {
        let source = "const x = 1;\nconst y = 2;\n";
        let (code, map) = run(source);
        assert_eq!(code, source);

        for offset in [0u32, 5, 13, 20] {
            assert_eq!(
                map.original_position(TextSize::from(offset)),
                Some(TextSize::from(offset))
            );
        }
    }

    #[test]
    fn test_prefix_maps_identically() {
        let source = "const t = html`<div>\n  <span>${\"x\"}</span>\n</div>`;";
        let (code, map) = run(source);
        assert_eq!(code, "const t = html`<div><span>${\"x\"}</span></div>`;");

        // The unmodified prefix `const t = html\`` maps 1:1.
        for offset in 0..offset_of(code.as_str(), "<div>") {
            assert_eq!(
                map.original_position(TextSize::from(offset)),
                Some(TextSize::from(offset))
            );
        }
    }

    #[test]
    fn test_hole_maps_to_original_position() {
        let source = "const t = html`<div>\n  <span>${\"x\"}</span>\n</div>`;";
        let (code, map) = run(source);

        let gen_hole = offset_of(&code, "${\"x\"}");
        let orig_hole = offset_of(source, "${\"x\"}");
        assert_eq!(
            map.original_position(TextSize::from(gen_hole)),
            Some(TextSize::from(orig_hole))
        );
        // Interior of the hole maps with the same shift.
        assert_eq!(
            map.original_position(TextSize::from(gen_hole + 3)),
            Some(TextSize::from(orig_hole + 3))
        );
    }

    #[test]
    fn test_minified_markup_maps_to_literal_start() {
        let source = "const t = html`<div>\n  <span>${\"x\"}</span>\n</div>`;";
        let (code, map) = run(source);

        let gen_div = offset_of(&code, "<div>");
        let orig_div = offset_of(source, "<div>");
        assert_eq!(
            map.original_position(TextSize::from(gen_div)),
            Some(TextSize::from(orig_div))
        );
    }

    #[test]
    fn test_suffix_after_edit_maps_with_shift() {
        let source = "const t = html`<p>\n  x\n</p>`;\nconst after = 1;\n";
        let (code, map) = run(source);
        assert_eq!(code, "const t = html`<p> x </p>`;\nconst after = 1;\n");

        let gen_after = offset_of(&code, "const after");
        let orig_after = offset_of(source, "const after");
        assert_eq!(
            map.original_position(TextSize::from(gen_after)),
            Some(TextSize::from(orig_after))
        );
    }

    #[test]
    fn test_overlapping_edit_rejected() {
        let unit = SourceUnit::new("test.ts", "0123456789");
        let edits = vec![
            Edit {
                span: Span::new(2u32, 6u32),
                replacement: "ab".to_string(),
                anchors: Vec::new(),
            },
            Edit {
                span: Span::new(4u32, 8u32),
                replacement: "cd".to_string(),
                anchors: Vec::new(),
            },
        ];
        assert_eq!(
            generate(&unit, &edits),
            Err(GenerateError::InvalidEdit { start: 4, end: 8 })
        );
    }

    #[test]
    fn test_out_of_bounds_edit_rejected() {
        let unit = SourceUnit::new("test.ts", "short");
        let edits = vec![Edit {
            span: Span::new(2u32, 99u32),
            replacement: String::new(),
            anchors: Vec::new(),
        }];
        assert!(generate(&unit, &edits).is_err());
    }
}
