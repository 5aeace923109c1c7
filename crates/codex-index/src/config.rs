//! Workspace configuration
//!
//! Read from `codex.toml` at the workspace root. Every key is optional; a
//! missing file means all defaults.
//!
//! ```toml
//! default_format = "json"
//! hidden_generated = true
//! merge_on_cascade = true
//!
//! [default_patterns]
//! include = ["**/*.md"]
//! exclude = ["_drafts/**"]
//! ```

use crate::error::IndexError;
use codex_model::{IndexFormat, Patterns};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file name at the workspace root
pub const CONFIG_FILE: &str = "codex.toml";

/// Settings shared by every operation on one workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Format of index files created by regeneration
    pub default_format: IndexFormat,
    /// Create generated indexes under the dot-prefixed name
    pub hidden_generated: bool,
    /// Resolve the root index after each cascade
    pub merge_on_cascade: bool,
    /// Discovery patterns given to newly generated indexes
    pub default_patterns: Patterns,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            default_format: IndexFormat::Yaml,
            hidden_generated: true,
            merge_on_cascade: true,
            default_patterns: Patterns::new(["**/*.md"], ["_drafts/**"]),
        }
    }
}

impl WorkspaceConfig {
    /// Load `codex.toml` from a workspace root, or defaults if absent
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(root: &Path) -> Result<Self, IndexError> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            tracing::debug!(root = %root.display(), "no {CONFIG_FILE}, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| IndexError::io(&path, e))?;
        Self::from_toml(&content, &path)
    }

    /// Parse configuration text; `path` is used in errors
    ///
    /// # Errors
    /// Returns [`IndexError::Config`] on invalid TOML or unknown keys
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, IndexError> {
        let config: Self = toml::from_str(content).map_err(|e| IndexError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.default_patterns.compile()?;
        Ok(config)
    }

    /// File name used for indexes created by regeneration
    #[inline]
    #[must_use]
    pub fn generated_index_name(&self) -> &'static str {
        self.default_format.index_file_name(self.hidden_generated)
    }
}
