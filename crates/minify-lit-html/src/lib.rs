//! Bundler plugin surface for lit-html template minification.
//!
//! The plugin mirrors the host's hook protocol: `resolve_id` offers
//! importer-relative resolution for files the plugin cares about, and
//! `transform` runs the template minifier over files passing the
//! include/exclude filter. Filtered-out files return `None` so the host
//! leaves them untouched; everything else gets a result, minified or fallen
//! back (see [`lit_transformer::transform`]).
//!
//! # Example
//!
//! ```
//! use minify_lit_html::{MinifyLitHtml, PluginOptions};
//!
//! # async fn demo() {
//! let plugin = MinifyLitHtml::new(PluginOptions::default()).unwrap();
//! let out = plugin
//!     .transform("const t = html`<p>\n  hi\n</p>`;", "/src/app.ts")
//!     .await
//!     .unwrap();
//! assert_eq!(out.code, "const t = html`<p> hi </p>`;");
//! # }
//! ```

mod filter;
mod plugin;

pub use filter::{FilterError, PathFilter};
pub use lit_transformer::{
    MinifyError, MinifyOptions, ParserOptions, SourceUnit, TransformError, TransformOutput,
};
pub use markup_minifier::Regex;
pub use plugin::{MinifyLitHtml, PluginOptions};
pub use source_map::SourceMapV3;
