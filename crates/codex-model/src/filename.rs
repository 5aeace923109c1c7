//! Index file naming conventions
//!
//! An include target is an index file purely because of its file name. The
//! dot-prefixed variants are generated caches that may be regenerated freely;
//! the visible names are authored and preserved.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// Authored YAML index
pub const INDEX_YAML: &str = "index.codex.yaml";
/// Authored JSON index
pub const INDEX_JSON: &str = "index.codex.json";
/// Generated YAML index cache
pub const HIDDEN_INDEX_YAML: &str = ".index.codex.yaml";
/// Generated JSON index cache
pub const HIDDEN_INDEX_JSON: &str = ".index.codex.json";

/// Lookup precedence when one folder carries more than one index file
pub const INDEX_FILE_NAMES: [&str; 4] = [INDEX_YAML, INDEX_JSON, HIDDEN_INDEX_YAML, HIDDEN_INDEX_JSON];

/// Serialization format of an index file, selected by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl IndexFormat {
    /// Format for a path, by extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }

    /// Canonical extension (without dot)
    #[inline]
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    /// Index file name for this format
    #[inline]
    #[must_use]
    pub const fn index_file_name(self, hidden: bool) -> &'static str {
        match (self, hidden) {
            (Self::Yaml, false) => INDEX_YAML,
            (Self::Json, false) => INDEX_JSON,
            (Self::Yaml, true) => HIDDEN_INDEX_YAML,
            (Self::Json, true) => HIDDEN_INDEX_JSON,
        }
    }
}

impl Display for IndexFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for IndexFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Unrecognised format name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown index format: '{0}' (expected yaml or json)")]
pub struct UnknownFormat(pub String);

/// What an index file name says about the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexFileKind {
    /// Serialization format
    pub format: IndexFormat,
    /// Generated cache (dot-prefixed) variant
    pub hidden: bool,
}

impl IndexFileKind {
    /// Whether the file is an authored index that regeneration must preserve
    #[inline]
    #[must_use]
    pub const fn is_authored(self) -> bool {
        !self.hidden
    }
}

/// Classify a path as an index file by its file name alone
#[must_use]
pub fn classify(path: &Path) -> Option<IndexFileKind> {
    let name = path.file_name()?.to_str()?;
    let (format, hidden) = match name {
        INDEX_YAML => (IndexFormat::Yaml, false),
        INDEX_JSON => (IndexFormat::Json, false),
        HIDDEN_INDEX_YAML => (IndexFormat::Yaml, true),
        HIDDEN_INDEX_JSON => (IndexFormat::Json, true),
        _ => return None,
    };
    Some(IndexFileKind { format, hidden })
}

/// Whether the path names an index file
#[inline]
#[must_use]
pub fn is_index_file(path: &Path) -> bool {
    classify(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_all_four_variants() {
        let yaml = classify(Path::new("book/index.codex.yaml")).unwrap();
        assert_eq!(yaml.format, IndexFormat::Yaml);
        assert!(!yaml.hidden);

        let hidden_json = classify(Path::new("/abs/.index.codex.json")).unwrap();
        assert_eq!(hidden_json.format, IndexFormat::Json);
        assert!(hidden_json.hidden);
        assert!(!hidden_json.is_authored());

        assert!(is_index_file(Path::new("index.codex.json")));
        assert!(is_index_file(Path::new(".index.codex.yaml")));
    }

    #[test]
    fn content_files_are_not_indexes() {
        assert!(!is_index_file(Path::new("chapter-01.md")));
        assert!(!is_index_file(Path::new("chapter.codex.yaml")));
        assert!(!is_index_file(Path::new("index.yaml")));
        assert!(!is_index_file(Path::new("..index.codex.yaml")));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(IndexFormat::from_path(Path::new("a.yml")), Some(IndexFormat::Yaml));
        assert_eq!(IndexFormat::from_path(Path::new("a.json")), Some(IndexFormat::Json));
        assert_eq!(IndexFormat::from_path(Path::new("a.md")), None);
    }

    #[test]
    fn format_from_str() {
        assert_eq!("YAML".parse::<IndexFormat>().unwrap(), IndexFormat::Yaml);
        assert!("toml".parse::<IndexFormat>().is_err());
    }

    #[test]
    fn index_file_names_per_format() {
        assert_eq!(IndexFormat::Json.index_file_name(true), HIDDEN_INDEX_JSON);
        assert_eq!(IndexFormat::Yaml.index_file_name(false), INDEX_YAML);
    }
}
