//! HTML minification for lit-html template contents.
//!
//! The text between a template literal's backticks is HTML with dynamic holes
//! (`${...}` interpolations) embedded in it. This crate minifies the static
//! markup while guaranteeing that no byte inside a protected fragment is
//! altered. Protection works the way html-minifier's `ignoreCustomFragments`
//! does, made explicit: protected ranges are masked with placeholder markers,
//! the masked text is minified, and the markers are restored verbatim.
//!
//! Protected fragments are determined by [`fragment::protected_spans`]: the
//! interpolation scanner plus a set of built-in and user-supplied patterns.

mod fragment;
mod minify;

pub use fragment::protected_spans;
pub use minify::{minify, minify_tracked, MinifyOutput, Preserved};
// Re-exported so callers can build `ignore_custom_fragments` without pinning
// their own regex version.
pub use regex::Regex;

use thiserror::Error;

/// Configuration for markup minification.
#[derive(Debug, Clone)]
pub struct MinifyOptions {
    /// Treat element names as case sensitive (keeps custom elements intact).
    pub case_sensitive: bool,
    /// Collapse whitespace in text content.
    pub collapse_whitespace: bool,
    /// Collapse inline-significant whitespace to a single space instead of
    /// removing it. Formatting-only runs (between tags, containing a newline)
    /// are still removed.
    pub conservative_collapse: bool,
    /// Emit a single newline for collapsed runs that contained one.
    pub preserve_line_breaks: bool,
    /// Strip `<!-- -->` comments. Comments containing a protected fragment
    /// are always kept.
    pub remove_comments: bool,
    /// Collapse whitespace inside `<style>` blocks. Off by default: dynamic
    /// holes inside style blocks are indistinguishable from CSS syntax, so
    /// style content is otherwise left untouched.
    pub minify_css: bool,
    /// Additional fragment-protection patterns beyond the built-ins.
    pub ignore_custom_fragments: Vec<Regex>,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            collapse_whitespace: true,
            conservative_collapse: true,
            preserve_line_breaks: false,
            remove_comments: true,
            minify_css: false,
            ignore_custom_fragments: Vec::new(),
        }
    }
}

/// Errors that can occur during minification.
///
/// These are never recovered locally; the caller decides what a failed span
/// means for the file (whole-file fallback).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinifyError {
    /// A `<!--` without a matching `-->`.
    #[error("unclosed comment starting at byte {at}")]
    UnclosedComment {
        /// Byte offset of the `<!--` in the (masked) template text.
        at: usize,
    },

    /// A `<` tag opening that never reaches its `>`.
    #[error("unclosed tag starting at byte {at}")]
    UnclosedTag {
        /// Byte offset of the `<` in the (masked) template text.
        at: usize,
    },

    /// A protected fragment disappeared during minification. Indicates a bug
    /// in the masking engine, surfaced instead of silently dropping a hole.
    #[error("protected fragment {index} missing from minified output")]
    MissingFragment {
        /// Index of the fragment in scan order.
        index: usize,
    },
}
