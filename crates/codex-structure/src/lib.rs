//! Codex Structure
//!
//! Write side of a Codex workspace: surgical edits to index files and the
//! bounded cascade that brings the indexes above an edit up to date.
//!
//! # Flow
//!
//! ```text
//! MutationOp ──► StructureEditor ──► MutationReceipt (touched files)
//!                                          │
//!                       CascadeEngine ◄────┘ (changed folders)
//!                             │
//!            FolderRegenerator per folder, deepest first
//!                             │
//!                             ▼
//!                CascadeReport (+ merged Resolution)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use codex_structure::{MutationOp, ParentRef, Workspace};
//!
//! let workspace = Workspace::open("novel")?;
//! let applied = workspace.apply(&MutationOp::Reorder {
//!     parent: ParentRef::root("novel/book-1/index.codex.yaml"),
//!     key: "./chapter-03.md".into(),
//!     position: 0,
//! })?;
//! println!("{}", applied.outcome());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cascade;
pub mod error;
pub mod generator;
pub mod mutation;
pub mod rebase;
pub mod workspace;

pub use cascade::{CascadeEngine, CascadeReport};
pub use error::{CascadeError, CascadeFailure, MutationError, MutationResult, ValidationError};
pub use generator::{FolderRegen, FolderRegenerator};
pub use mutation::{
    BatchItem, BatchReport, MutationKind, MutationOp, MutationReceipt, ParentRef, StructureEditor,
};
pub use rebase::{rebase_include, rebase_node};
pub use workspace::{Applied, BatchApplied, Workspace};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
