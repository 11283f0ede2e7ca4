//! Source position tracking and mapping for minify-lit-html.
//!
//! This crate provides utilities for tracking source positions through the
//! template-minifying transform, enabling the generated code to be mapped back
//! to the original JavaScript/TypeScript source. It covers:
//! - Byte spans and line/column indexing
//! - A mapping builder that records verbatim and rewritten segments
//! - Rendering to a version-3 source map (the format returned to the host)

mod builder;
mod line_index;
mod span;
mod v3;

pub use builder::{Mapping, SourceMap, SourceMapBuilder};
pub use line_index::{LineCol, LineIndex};
pub use span::{ByteOffset, Span};
pub use v3::SourceMapV3;
