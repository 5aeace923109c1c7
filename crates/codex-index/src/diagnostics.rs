//! Soft conditions reported alongside a result
//!
//! None of these abort an operation. They are collected and handed to the
//! caller, who decides how to surface them (broken-link badges, warnings).

use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// A recovered problem found during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// `include:` target does not exist; the node is kept, marked unresolved
    UnresolvedReference {
        /// Index file holding the include
        file: PathBuf,
        include: String,
        target: PathBuf,
    },

    /// Sub-index already entered in this pass; the child was skipped
    CircularReference {
        file: PathBuf,
        include: String,
        target: PathBuf,
    },

    /// Sub-index exists but could not be parsed; the node is kept, marked
    /// malformed
    Malformed {
        file: PathBuf,
        target: PathBuf,
        message: String,
    },
}

impl Diagnostic {
    /// Index file whose entry produced the diagnostic
    #[must_use]
    pub fn file(&self) -> &std::path::Path {
        match self {
            Self::UnresolvedReference { file, .. }
            | Self::CircularReference { file, .. }
            | Self::Malformed { file, .. } => file,
        }
    }

    /// Path the entry pointed at
    #[must_use]
    pub fn target(&self) -> &std::path::Path {
        match self {
            Self::UnresolvedReference { target, .. }
            | Self::CircularReference { target, .. }
            | Self::Malformed { target, .. } => target,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference { file, include, .. } => {
                write!(f, "{}: unresolved include '{include}'", file.display())
            }
            Self::CircularReference { file, include, .. } => {
                write!(f, "{}: circular include '{include}' skipped", file.display())
            }
            Self::Malformed { target, message, .. } => {
                write!(f, "{}: malformed sub-index: {message}", target.display())
            }
        }
    }
}

/// Caller-facing classification of an operation's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// Completed with nothing to report
    Succeeded,
    /// Completed; this many diagnostics or per-item failures were recorded
    SucceededWithDiagnostics(usize),
    /// Refused before any change was made
    Rejected(String),
}

impl Outcome {
    /// Classify a completed operation by its diagnostic count
    #[inline]
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            Self::Succeeded
        } else {
            Self::SucceededWithDiagnostics(count)
        }
    }

    /// Whether the operation went ahead
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::SucceededWithDiagnostics(n) => write!(f, "succeeded with {n} diagnostic(s)"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}
