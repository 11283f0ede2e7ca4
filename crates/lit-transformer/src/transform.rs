//! Top-level per-file orchestration with whole-file fallback.

use crate::generate::{generate, GenerateError};
use crate::locate::locate;
use crate::parse::{parse, ParseError, ParserOptions};
use crate::rewrite::rewrite;
use crate::SourceUnit;
use markup_minifier::{MinifyError, MinifyOptions};
use smol_str::SmolStr;
use source_map::SourceMapV3;
use thiserror::Error;

/// Options for the transform.
#[derive(Debug, Clone)]
pub struct Options {
    /// The tag name marking markup templates.
    pub tag_name: SmolStr,
    /// Emit a diagnostic when a file falls back to its original source.
    pub verbose: bool,
    /// Parser behavior.
    pub parser: ParserOptions,
    /// Markup minification behavior.
    pub minify: MinifyOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tag_name: SmolStr::new_static(crate::DEFAULT_TAG),
            verbose: true,
            parser: ParserOptions::default(),
            minify: MinifyOptions::default(),
        }
    }
}

/// Why a file's transform was abandoned.
///
/// Every variant aborts the whole file; there is no per-template partial
/// success. The coarse recovery is deliberate: one failing template leaves
/// the file un-minified, never half-rewritten.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// Source could not be parsed under either grammar.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A matched template's markup could not be minified.
    #[error(transparent)]
    Minify(#[from] MinifyError),

    /// The edit plan could not be applied.
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// The transform's result: generated code plus its source map.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// The output source text.
    pub code: String,
    /// A version-3 map; the empty map when the transform fell back.
    pub map: SourceMapV3,
}

/// Runs the pipeline, short-circuiting on the first error.
pub fn try_transform(unit: &SourceUnit, options: &Options) -> Result<TransformOutput, TransformError> {
    let parsed = parse(&unit.text, &options.parser)?;
    let matches = locate(&parsed, &unit.text, &options.tag_name);
    tracing::debug!(file = %unit.id, matches = matches.len(), "located markup templates");

    let edits = rewrite(&unit.text, &matches, &options.minify)?;
    let (code, map) = generate(unit, &edits)?;
    let map = SourceMapV3::render(&map, &unit.id, &unit.text, &code);

    Ok(TransformOutput { code, map })
}

/// Transforms a file, falling back to the unmodified source on any error.
///
/// The fallback returns the original text with the neutral empty map and,
/// when `verbose` is set, emits one warning naming the file and the cause.
pub fn transform(unit: &SourceUnit, options: &Options) -> TransformOutput {
    match try_transform(unit, options) {
        Ok(output) => output,
        Err(error) => {
            if options.verbose {
                tracing::warn!(
                    file = %unit.id,
                    %error,
                    "could not minify templates; emitting source unchanged"
                );
            }
            TransformOutput {
                code: unit.text.clone(),
                map: SourceMapV3::empty(),
            }
        }
    }
}
