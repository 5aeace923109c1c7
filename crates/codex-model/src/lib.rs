//! Codex Index Model
//!
//! Pure data types for hierarchical Codex documents stored across index files.
//! Nothing in this crate performs I/O.
//!
//! # Core Concepts
//!
//! - [`IndexDocument`]: One index file, typed
//! - [`ChildNode`]: Inline node, content include, or sub-index include
//! - [`ResolvedNode`]: Node of the merged tree, with derived bookkeeping
//! - [`DirChain`]: Directory-name chain that locates a node on disk
//! - [`ordering`]: Per-list ordering policy
//! - [`ContentHash`]: Blake3 hash used to skip identical writes
//!
//! # Example
//!
//! ```rust
//! use codex_model::{ChildNode, IndexDocument};
//!
//! let doc = IndexDocument::new("root", "index", "My Novel")
//!     .with_child(ChildNode::include("./book-1/index.codex.yaml"))
//!     .with_child(ChildNode::include("./notes.md"));
//!
//! assert!(matches!(doc.children[0], ChildNode::SubIndex(_)));
//! assert!(matches!(doc.children[1], ChildNode::Leaf(_)));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod hash;
mod patterns;
mod resolved;

pub mod filename;
pub mod ordering;
pub mod path;

pub use document::{
    slugify, ChildNode, Extra, IncludeRef, IndexDocument, InlineNode, Location, NodeMeta, RawChild,
    RawIndex, DEFAULT_INDEX_TYPE,
};
pub use filename::{IndexFileKind, IndexFormat, UnknownFormat};
pub use hash::ContentHash;
pub use ordering::{OrderMode, Ordered};
pub use path::{DirChain, PathError};
pub use patterns::{PatternError, PatternMatcher, Patterns};
pub use resolved::{find_by_id, for_each_with_chain, NodeKind, NodeStatus, ResolvedNode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
