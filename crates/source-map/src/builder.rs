//! Source map builder for tracking position mappings during the transform.

use crate::{ByteOffset, Span};
use text_size::TextSize;

/// A single mapping from a generated span to an original span.
///
/// An `exact` mapping covers a segment that was copied byte-for-byte, so any
/// offset within it maps 1:1. A non-exact mapping covers rewritten text whose
/// length differs from the original span; positions inside it resolve to the
/// original span's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// The span in the generated output.
    pub generated: Span,
    /// The span in the original source.
    pub original: Span,
    /// Whether the generated text is byte-identical to the original span.
    pub exact: bool,
}

/// A source map that tracks position mappings from generated code back to
/// original source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    /// List of mappings, sorted by generated position.
    mappings: Vec<Mapping>,
}

impl SourceMap {
    /// Creates a new empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source map builder.
    pub fn builder() -> SourceMapBuilder {
        SourceMapBuilder::new()
    }

    /// Returns the number of mappings in this source map.
    #[inline]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if this source map has no mappings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Returns an iterator over all mappings.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter()
    }

    /// Finds the original position corresponding to a generated position.
    ///
    /// Returns `None` if no mapping covers the given position.
    pub fn original_position(&self, generated: ByteOffset) -> Option<ByteOffset> {
        let mapping = self.find_mapping_for_generated(generated)?;

        if mapping.exact {
            let offset_in_span = u32::from(generated) - u32::from(mapping.generated.start);
            Some(mapping.original.start + TextSize::from(offset_in_span))
        } else {
            // Rewritten text: everything resolves to the start of the span.
            Some(mapping.original.start)
        }
    }

    /// Finds the generated position corresponding to an original position.
    ///
    /// Only exact mappings can be resolved in this direction. Returns `None`
    /// if no exact mapping covers the given position.
    pub fn generated_position(&self, original: ByteOffset) -> Option<ByteOffset> {
        for mapping in &self.mappings {
            if mapping.exact && mapping.original.contains(original) {
                let offset_in_span = u32::from(original) - u32::from(mapping.original.start);
                return Some(mapping.generated.start + TextSize::from(offset_in_span));
            }
        }
        None
    }

    /// Finds the mapping that contains the given generated position.
    fn find_mapping_for_generated(&self, generated: ByteOffset) -> Option<&Mapping> {
        let idx = match self
            .mappings
            .binary_search_by(|m| m.generated.start.cmp(&generated))
        {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };

        self.mappings
            .get(idx)
            .filter(|m| m.generated.contains(generated))
    }
}

/// A builder for constructing source maps during the transform.
///
/// The builder tracks a cursor in the generated output; segments must be added
/// in generated order.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    mappings: Vec<Mapping>,
    /// Current position in the generated output.
    generated_offset: ByteOffset,
}

impl SourceMapBuilder {
    /// Creates a new source map builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current generated offset.
    #[inline]
    pub fn generated_offset(&self) -> ByteOffset {
        self.generated_offset
    }

    /// Adds verbatim source text, creating an exact 1:1 mapping.
    ///
    /// Use this when copying text from the original source unchanged.
    pub fn add_source(&mut self, original_start: ByteOffset, text: &str) {
        let len = TextSize::from(text.len() as u32);
        self.push(Span::new(original_start, original_start + len), len, true);
    }

    /// Adds an exact mapping for a preserved original span.
    ///
    /// The generated segment has the same length as the span. Used for dynamic
    /// holes carried through minification byte-for-byte.
    pub fn add_exact(&mut self, original: Span) {
        self.push(original, original.len(), true);
    }

    /// Adds rewritten content where the generated text differs from the
    /// original span it replaces.
    pub fn add_rewritten(&mut self, original: Span, generated_text: &str) {
        self.push(original, TextSize::from(generated_text.len() as u32), false);
    }

    fn push(&mut self, original: Span, generated_len: TextSize, exact: bool) {
        if generated_len == TextSize::from(0) {
            // An empty generated segment maps nothing; just note the position.
            return;
        }
        let generated = Span::new(self.generated_offset, self.generated_offset + generated_len);
        self.mappings.push(Mapping {
            generated,
            original,
            exact,
        });
        self.generated_offset = generated.end;
    }

    /// Builds the final source map.
    pub fn build(mut self) -> SourceMap {
        // Sort mappings by generated position for efficient lookup
        self.mappings.sort_by_key(|m| m.generated.start);
        SourceMap {
            mappings: self.mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_map() {
        let map = SourceMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_builder_verbatim_and_rewritten() {
        let mut builder = SourceMapBuilder::new();
        // "abc" copied from offset 0, then "<div>..." (10 bytes at 3..20)
        // minified down to 5 bytes, then "xyz" copied from offset 20.
        builder.add_source(TextSize::from(0), "abc");
        builder.add_rewritten(Span::new(3u32, 20u32), "<div>");
        builder.add_source(TextSize::from(20), "xyz");

        let map = builder.build();
        assert_eq!(map.len(), 3);

        // Verbatim prefix maps 1:1.
        assert_eq!(
            map.original_position(TextSize::from(2)),
            Some(TextSize::from(2))
        );

        // Positions inside the rewritten segment resolve to its span start.
        assert_eq!(
            map.original_position(TextSize::from(4)),
            Some(TextSize::from(3))
        );
        assert_eq!(
            map.original_position(TextSize::from(7)),
            Some(TextSize::from(3))
        );

        // Verbatim suffix: generated 8..11 maps to original 20..23.
        assert_eq!(
            map.original_position(TextSize::from(9)),
            Some(TextSize::from(21))
        );
    }

    #[test]
    fn test_builder_exact_hole() {
        let mut builder = SourceMapBuilder::new();
        builder.add_rewritten(Span::new(0u32, 10u32), "<p>");
        builder.add_exact(Span::new(10u32, 17u32));

        let map = builder.build();

        // The exact segment (generated 3..10) maps 1:1 to original 10..17.
        assert_eq!(
            map.original_position(TextSize::from(3)),
            Some(TextSize::from(10))
        );
        assert_eq!(
            map.original_position(TextSize::from(8)),
            Some(TextSize::from(15))
        );
        assert_eq!(
            map.generated_position(TextSize::from(12)),
            Some(TextSize::from(5))
        );
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let mut builder = SourceMapBuilder::new();
        builder.add_source(TextSize::from(0), "");
        builder.add_rewritten(Span::new(0u32, 4u32), "");
        assert!(builder.build().is_empty());
    }
}
