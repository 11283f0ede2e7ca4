//! Include/exclude path filtering.

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;

/// A filter pattern could not be compiled.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {source}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        source: globset::Error,
    },
}

/// Decides which file ids the plugin handles.
///
/// A file is handled when it matches the include set (or the include set is
/// empty) and does not match the exclude set.
#[derive(Debug)]
pub struct PathFilter {
    include: GlobSet,
    include_empty: bool,
    exclude: GlobSet,
}

impl PathFilter {
    /// Compiles include and exclude glob patterns into a filter.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, FilterError> {
        Ok(Self {
            include: build_set(include)?,
            include_empty: include.is_empty(),
            exclude: build_set(exclude)?,
        })
    }

    /// Returns true if the plugin should handle `id`.
    pub fn is_match(&self, id: &str) -> bool {
        let id = id.strip_prefix("./").unwrap_or(id);
        (self.include_empty || self.include.is_match(id)) && !self.exclude.is_match(id)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, FilterError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| FilterError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| FilterError::InvalidGlob {
        pattern: String::new(),
        source,
    })
}
