//! Merged tree produced by resolution
//!
//! A [`ResolvedNode`] is what a UI consumes: includes already expanded, every
//! list already ordered, and each node annotated with where it came from
//! (`_parent_file`, `_parent_entity`) and where it lives (`_filename`,
//! `_subindex_path`).

use crate::ordering::Ordered;
use crate::path::DirChain;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// What a resolved node was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Inline node of some index file
    Inline,
    /// Include of a content file
    Content,
    /// Include of another index, expanded in place
    SubIndex,
}

/// Whether the node's source could be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Loaded (or nothing to load)
    Resolved,
    /// Include target does not exist
    Unresolved,
    /// Sub-index exists but could not be parsed
    Malformed,
}

/// Node of the merged tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub kind: NodeKind,
    pub status: NodeStatus,
    /// Include string as authored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    /// On-disk name: directory basename for sub-indexes, relative include
    /// path for content files
    #[serde(rename = "_filename", default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Absolute path of the include target
    #[serde(rename = "_subindex_path", default, skip_serializing_if = "Option::is_none")]
    pub subindex_path: Option<PathBuf>,
    /// Index file whose children list holds this entry
    #[serde(rename = "_parent_file")]
    pub parent_file: PathBuf,
    /// Inline node owning that list (`None` for the file's own list)
    #[serde(rename = "_parent_entity", default, skip_serializing_if = "Option::is_none")]
    pub parent_entity: Option<String>,
    #[serde(rename = "_depth")]
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResolvedNode>,
}

impl ResolvedNode {
    /// Whether the node's source loaded
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == NodeStatus::Resolved
    }

    /// Directory the node's include contributes to the path chain
    ///
    /// Sub-indexes contribute their directory, content files their relative
    /// path, inline nodes nothing.
    #[must_use]
    pub fn chain_segment(&self) -> Option<Cow<'_, str>> {
        let include = self.include.as_deref()?;
        match self.kind {
            NodeKind::Inline => None,
            NodeKind::Content => Some(Cow::Borrowed(include)),
            NodeKind::SubIndex => Some(
                Path::new(include)
                    .parent()
                    .map_or(Cow::Borrowed(""), |p| p.to_string_lossy()),
            ),
        }
    }

    /// Number of nodes in this subtree, self included
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

impl Ordered for ResolvedNode {
    fn order_key(&self) -> Option<i64> {
        self.order
    }

    fn sort_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn nested_mut(&mut self) -> Option<&mut Vec<Self>> {
        Some(&mut self.children)
    }
}

/// Visit every node depth-first with its directory chain
///
/// The chain is built from directory names and include paths only, so
/// `root_dir` joined with it is the node's on-disk location.
pub fn for_each_with_chain<F>(nodes: &[ResolvedNode], mut visit: F)
where
    F: FnMut(&ResolvedNode, &DirChain),
{
    fn walk<F>(nodes: &[ResolvedNode], chain: &DirChain, visit: &mut F)
    where
        F: FnMut(&ResolvedNode, &DirChain),
    {
        for node in nodes {
            let own = match node.chain_segment() {
                Some(segment) => chain.extend_relative(&segment),
                None => chain.clone(),
            };
            visit(node, &own);
            walk(&node.children, &own, visit);
        }
    }
    walk(nodes, &DirChain::root(), &mut visit);
}

/// Find a node anywhere in a merged tree by id
#[must_use]
pub fn find_by_id<'a>(nodes: &'a [ResolvedNode], id: &str) -> Option<&'a ResolvedNode> {
    nodes.iter().find_map(|n| {
        if n.id == id {
            Some(n)
        } else {
            find_by_id(&n.children, id)
        }
    })
}
