//! The plugin type and its hook implementations.

use crate::filter::{FilterError, PathFilter};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use lit_transformer::{transform, Options, ParserOptions, SourceUnit, TransformOutput};
use markup_minifier::MinifyOptions;
use smol_str::SmolStr;

/// Plugin configuration.
#[derive(Debug, Clone)]
pub struct PluginOptions {
    /// Glob patterns of file ids to handle. Empty means every file.
    pub include: Vec<String>,
    /// Glob patterns of file ids to skip.
    pub exclude: Vec<String>,
    /// Emit a diagnostic when a file falls back to its original source.
    pub verbose: bool,
    /// The tag name marking markup templates.
    pub tag_name: SmolStr,
    /// Parser behavior.
    pub parser: ParserOptions,
    /// Markup minification behavior, including extra protected-fragment
    /// patterns via `ignore_custom_fragments`.
    pub minify: MinifyOptions,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            include: vec!["**/*.js".to_string(), "**/*.ts".to_string()],
            exclude: Vec::new(),
            verbose: true,
            tag_name: SmolStr::new_static(lit_transformer::DEFAULT_TAG),
            parser: ParserOptions::default(),
            minify: MinifyOptions::default(),
        }
    }
}

/// The lit-html minifying plugin.
///
/// Holds no per-file state: `transform` is a pure function of its inputs and
/// may be called concurrently for distinct files.
#[derive(Debug)]
pub struct MinifyLitHtml {
    filter: PathFilter,
    options: Options,
}

impl MinifyLitHtml {
    /// Creates the plugin, compiling its path filter.
    pub fn new(options: PluginOptions) -> Result<Self, FilterError> {
        let filter = PathFilter::new(&options.include, &options.exclude)?;
        Ok(Self {
            filter,
            options: Options {
                tag_name: options.tag_name,
                verbose: options.verbose,
                parser: options.parser,
                minify: options.minify,
            },
        })
    }

    /// Resolves `id` relative to the importing file.
    ///
    /// Returns `None` when there is no importer (entry points) or when `id`
    /// falls outside the filter, deferring resolution to the host.
    pub fn resolve_id(&self, id: &str, importer: Option<&str>) -> Option<Utf8PathBuf> {
        let importer = importer?;
        if !self.filter.is_match(id) {
            return None;
        }
        let dir = Utf8Path::new(importer)
            .parent()
            .unwrap_or_else(|| Utf8Path::new(""));
        Some(normalize(&dir.join(id)))
    }

    /// Minifies the markup templates of one file.
    ///
    /// Returns `None` when `id` fails the filter (the host leaves the file
    /// untouched). Otherwise returns the transform result — minified code
    /// with its map, or the original source with an empty map if the file
    /// could not be processed.
    pub async fn transform(&self, code: &str, id: &str) -> Option<TransformOutput> {
        if !self.filter.is_match(id) {
            return None;
        }
        let unit = SourceUnit::new(id, code);
        Some(transform(&unit, &self.options))
    }
}

/// Lexically resolves `.` and `..` components.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}
