//! Auto-discovery patterns
//!
//! An index may declare `patterns: { include: [...], exclude: [...] }` so files
//! that are not explicitly listed can still be picked up when its folder is
//! regenerated. Globs are matched against paths relative to the index's
//! directory, with `/` as a literal separator (`*` never crosses folders,
//! `**` does).

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declared include/exclude globs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patterns {
    /// Globs a file must match to be discovered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Globs that veto a match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl Patterns {
    /// Create from include and exclude globs
    #[must_use]
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Compile the globs
    ///
    /// # Errors
    /// Returns the first glob that fails to compile
    pub fn compile(&self) -> Result<PatternMatcher, PatternError> {
        let compile_all = |globs: &[String]| {
            globs
                .iter()
                .map(|g| {
                    Pattern::new(g).map_err(|e| PatternError {
                        pattern: g.clone(),
                        message: e.msg.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(PatternMatcher {
            include: compile_all(&self.include)?,
            exclude: compile_all(&self.exclude)?,
        })
    }
}

/// Compiled [`Patterns`]
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PatternMatcher {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    /// Whether a path relative to the index directory is discovered
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        self.include
            .iter()
            .any(|p| p.matches_path_with(relative, Self::OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_path_with(relative, Self::OPTIONS))
    }

    /// Whether any exclude glob rules out a whole directory
    ///
    /// Lets discovery skip descending into e.g. `_drafts/`.
    #[must_use]
    pub fn excludes_dir(&self, relative_dir: &Path) -> bool {
        let probe = relative_dir.join("_");
        self.exclude
            .iter()
            .any(|p| p.matches_path_with(relative_dir, Self::OPTIONS) || p.matches_path_with(&probe, Self::OPTIONS))
    }
}

/// Invalid glob in a `patterns` block
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pattern '{pattern}': {message}")]
pub struct PatternError {
    /// Offending glob
    pub pattern: String,
    /// Reason from the glob compiler
    pub message: String,
}
