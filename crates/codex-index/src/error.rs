//! Error types for index ingress and egress
//!
//! - [`ParseError`]: file content → [`IndexDocument`](codex_model::IndexDocument)
//! - [`SerializeError`]: document → bytes
//! - [`IndexError`]: everything a store, resolver, or job can fail with

use codex_model::PatternError;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Line/column inside a file (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

fn at(position: Option<&Position>) -> String {
    position.map(|p| format!(":{p}")).unwrap_or_default()
}

/// Errors during index parsing (ingress)
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Content is not valid YAML/JSON
    #[error("syntax error in {}{}: {message}", .path.display(), at(.position.as_ref()))]
    Syntax {
        path: PathBuf,
        position: Option<Position>,
        message: String,
    },

    /// Content is not UTF-8
    #[error("{} is not valid UTF-8", .path.display())]
    Encoding { path: PathBuf },

    /// Valid syntax, but not shaped like an index
    #[error("{} is not an index document: {message}", .path.display())]
    Shape { path: PathBuf, message: String },

    /// No parser handles the file's extension
    #[error("no parser registered for '{}'", .0.display())]
    NoParser(PathBuf),
}

impl ParseError {
    /// Create syntax error for path
    pub fn syntax(path: impl Into<PathBuf>, position: Option<Position>, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            position,
            message: message.into(),
        }
    }

    /// Create shape error for path
    pub fn shape(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Shape {
            path: path.into(),
            message: message.into(),
        }
    }

    /// File the error refers to
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Syntax { path, .. } | Self::Encoding { path } | Self::Shape { path, .. } => path,
            Self::NoParser(path) => path,
        }
    }

    /// Position of a syntax error, when the format reports one
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Syntax { position, .. } => *position,
            _ => None,
        }
    }
}

/// Errors during index serialization (egress)
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// YAML emitter failed
    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON emitter failed
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the index store, resolver, and related operations
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("serialize error: {0}")]
    Serialize(#[from] SerializeError),

    /// Index file (or folder index) does not exist
    #[error("index not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Path does not name an index file
    #[error("not an index file: {}", .0.display())]
    NotAnIndex(PathBuf),

    /// IO error reading or writing a file
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Workspace configuration could not be read
    #[error("invalid configuration {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Walking the workspace failed
    #[error("directory walk failed: {0}")]
    Walk(#[from] ignore::Error),

    /// Resolution was cancelled before finishing
    #[error("resolution cancelled")]
    Cancelled,
}

impl IndexError {
    /// Create IO error for path, mapping missing files to [`IndexError::NotFound`]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;
