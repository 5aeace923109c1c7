//! Error types for structure edits and cascades
//!
//! - [`ValidationError`]: an edit refused before anything was written
//! - [`MutationError`]: everything a structure edit can fail with
//! - [`CascadeError`]: one folder's regeneration failed
//! - [`CascadeFailure`]: a recorded per-folder failure inside a cascade

use codex_index::IndexError;
use codex_model::{PathError, PatternError};
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Reasons an edit is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No entry with this key in the addressed list
    #[error("no node '{key}' in {}", .file.display())]
    NodeNotFound { key: String, file: PathBuf },

    /// The target file already holds an entry with this key
    #[error("node '{key}' already exists in {}", .file.display())]
    DuplicateKey { key: String, file: PathBuf },

    /// `entity` names no inline node of the file
    #[error("no inline node '{entity}' in {}", .file.display())]
    UnknownEntity { entity: String, file: PathBuf },

    /// Destination lies inside the node being moved
    #[error("cannot move '{key}' into itself or one of its descendants")]
    MoveIntoDescendant { key: String },

    /// An include of the moved node cannot be expressed from its new folder
    #[error("cannot rebase include '{include}': {source}")]
    Rebase {
        include: String,
        #[source]
        source: PathError,
    },
}

/// Errors from structure mutation operations
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl MutationError {
    /// Whether the edit was refused (as opposed to failing on IO)
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Errors regenerating one folder's index
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Path is not a directory
    #[error("not a folder: {}", .0.display())]
    NotAFolder(PathBuf),

    /// Folder lies outside the workspace root
    #[error("{} is outside workspace {}", .folder.display(), .root.display())]
    OutsideWorkspace { folder: PathBuf, root: PathBuf },
}

/// One folder that could not be regenerated during a cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeFailure {
    pub folder: PathBuf,
    pub reason: String,
}

impl CascadeFailure {
    /// Record a failure for `folder`
    pub fn new(folder: impl Into<PathBuf>, reason: impl Display) -> Self {
        Self {
            folder: folder.into(),
            reason: reason.to_string(),
        }
    }
}

impl Display for CascadeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.folder.display(), self.reason)
    }
}

/// Result type alias for mutations
pub type MutationResult<T> = Result<T, MutationError>;
