//! Codex Index
//!
//! Read side of a Codex workspace: parse index files, resolve includes into
//! one merged tree, and work out which files the master index owns.
//!
//! # Pipeline
//!
//! ```text
//! disk ──► IndexStore ──► ParserRegistry ──► IndexDocument
//!                                               │
//!                          SubIndexResolver ◄───┘ (recursive, visited set)
//!                                │
//!                                ▼
//!                           Resolution (merged tree + diagnostics)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use codex_index::{IndexStore, SubIndexResolver};
//!
//! let store = IndexStore::new();
//! let resolution = SubIndexResolver::new(&store).resolve_file("novel/index.codex.yaml".as_ref())?;
//! for diagnostic in &resolution.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod job;
pub mod orphans;
pub mod parsers;
pub mod resolver;
pub mod store;

pub use config::{WorkspaceConfig, CONFIG_FILE};
pub use diagnostics::{Diagnostic, Outcome};
pub use error::{IndexError, IndexResult, ParseError, Position, SerializeError};
pub use job::{CancelToken, JobState, ResolveJob};
pub use orphans::{compute_orphans, discover_sub_indexes, is_claimed, ChildRef, DiscoveredIndex, OrphanTracker};
pub use parsers::{default_parsers, parse_index, serialize_index, IndexParser, ParserRegistry};
pub use resolver::{Resolution, SubIndexResolver};
pub use store::{index_file_in, write_atomic, IndexStore, LoadedIndex, StoreStats, WriteOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
