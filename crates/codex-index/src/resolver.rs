//! Sub-index resolution
//!
//! Expands `include:` references into one merged tree. Each sub-index is
//! resolved against its own directory, so paths only ever compose from
//! directory names and include strings. A per-pass `visited` set of absolute
//! sub-index paths guarantees each index file is entered at most once; a
//! repeat is skipped and reported, never followed.

use crate::diagnostics::{Diagnostic, Outcome};
use crate::error::{IndexError, IndexResult};
use crate::job::{CancelToken, ResolveJob};
use crate::store::IndexStore;
use codex_model::ordering::sort_siblings;
use codex_model::path::{basename, normalize};
use codex_model::{
    find_by_id, ChildNode, IncludeRef, IndexDocument, InlineNode, NodeKind, NodeStatus,
    ResolvedNode, DEFAULT_INDEX_TYPE,
};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Type given to content includes that declare none
pub const DEFAULT_CONTENT_TYPE: &str = "document";

/// Merged tree of one root index
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub root_id: String,
    pub root_type: String,
    pub root_name: String,
    /// Absolute path of the root index file
    pub root_path: PathBuf,
    pub children: Vec<ResolvedNode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Directory of the root index; resolved chains are relative to it
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        self.root_path.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Structured result for the caller
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        Outcome::from_count(self.diagnostics.len())
    }

    /// Total number of nodes in the merged tree
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.children.iter().map(ResolvedNode::subtree_len).sum()
    }

    /// Find a node by id anywhere in the tree
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ResolvedNode> {
        find_by_id(&self.children, id)
    }
}

/// Where a children list lives while it is being resolved
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    /// Index file holding the list
    pub(crate) file: &'a Path,
    /// Directory includes are relative to
    pub(crate) base_dir: &'a Path,
    /// Inline node owning the list, `None` for the file's own list
    pub(crate) parent_entity: Option<&'a str>,
    pub(crate) depth: usize,
}

impl<'a> Scope<'a> {
    pub(crate) fn root(file: &'a Path, base_dir: &'a Path) -> Self {
        Self {
            file,
            base_dir,
            parent_entity: None,
            depth: 0,
        }
    }
}

/// Expands includes into a merged tree
#[derive(Debug, Clone, Copy)]
pub struct SubIndexResolver<'s> {
    store: &'s IndexStore,
}

impl<'s> SubIndexResolver<'s> {
    /// Create resolver reading through `store`
    #[inline]
    #[must_use]
    pub fn new(store: &'s IndexStore) -> Self {
        Self { store }
    }

    /// Store this resolver reads from
    #[inline]
    #[must_use]
    pub fn store(&self) -> &'s IndexStore {
        self.store
    }

    /// Resolve a root index file in one pass with a fresh visited set
    ///
    /// # Errors
    /// Returns error only if the root file itself cannot be loaded; problems
    /// below it become diagnostics
    pub fn resolve_file(&self, path: &Path) -> IndexResult<Resolution> {
        ResolveJob::start(self.store, path, CancelToken::new())?.run()
    }

    /// Resolve a document's children against `base_dir`
    ///
    /// `visited` holds the absolute index paths already entered in this pass
    /// (normally including `doc_path`) and is updated in place.
    pub fn resolve(
        &self,
        doc: &IndexDocument,
        doc_path: &Path,
        base_dir: &Path,
        visited: &mut HashSet<PathBuf>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<ResolvedNode> {
        self.resolve_list(&doc.children, Scope::root(doc_path, base_dir), visited, diagnostics)
    }

    pub(crate) fn resolve_list(
        &self,
        children: &[ChildNode],
        scope: Scope<'_>,
        visited: &mut HashSet<PathBuf>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<ResolvedNode> {
        let mut resolved: Vec<ResolvedNode> = children
            .iter()
            .filter_map(|child| self.resolve_child(child, scope, visited, diagnostics))
            .collect();
        sort_siblings(&mut resolved);
        resolved
    }

    /// Resolve one child; `None` when it was skipped as a circular reference
    pub(crate) fn resolve_child(
        &self,
        child: &ChildNode,
        scope: Scope<'_>,
        visited: &mut HashSet<PathBuf>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedNode> {
        match child {
            ChildNode::Inline(node) => Some(self.resolve_inline(node, scope, visited, diagnostics)),
            ChildNode::Leaf(include) => Some(resolve_leaf(include, scope, diagnostics)),
            ChildNode::SubIndex(include) => self.resolve_sub_index(include, scope, visited, diagnostics),
        }
    }

    fn resolve_inline(
        &self,
        node: &InlineNode,
        scope: Scope<'_>,
        visited: &mut HashSet<PathBuf>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ResolvedNode {
        let inner = Scope {
            parent_entity: Some(&node.id),
            depth: scope.depth + 1,
            ..scope
        };
        ResolvedNode {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            name: node.name.clone(),
            summary: node.summary.clone(),
            order: node.order,
            kind: NodeKind::Inline,
            status: NodeStatus::Resolved,
            include: None,
            filename: node.filename.clone(),
            subindex_path: None,
            parent_file: scope.file.to_path_buf(),
            parent_entity: scope.parent_entity.map(str::to_string),
            depth: scope.depth,
            children: self.resolve_list(&node.children, inner, visited, diagnostics),
        }
    }

    fn resolve_sub_index(
        &self,
        include: &IncludeRef,
        scope: Scope<'_>,
        visited: &mut HashSet<PathBuf>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedNode> {
        let target = normalize(&scope.base_dir.join(&include.include));
        if !visited.insert(target.clone()) {
            tracing::warn!(
                file = %scope.file.display(),
                include = %include.include,
                "circular sub-index reference skipped"
            );
            diagnostics.push(Diagnostic::CircularReference {
                file: scope.file.to_path_buf(),
                include: include.include.clone(),
                target,
            });
            return None;
        }

        let dir = target.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut node = include_node(include, scope, NodeKind::SubIndex, &target);
        node.filename = Some(basename(&dir));

        match self.store.load(&target) {
            Ok(loaded) => {
                let doc = loaded.document;
                let meta = &include.meta;
                node.id = meta.id.clone().unwrap_or_else(|| doc.id.clone());
                node.node_type = meta.node_type.clone().unwrap_or_else(|| doc.node_type.clone());
                node.name = meta.name.clone().unwrap_or_else(|| doc.name.clone());
                node.summary = meta.summary.clone().or_else(|| doc.summary.clone());

                let inner = Scope {
                    file: &target,
                    base_dir: &dir,
                    parent_entity: None,
                    depth: scope.depth + 1,
                };
                node.children = self.resolve_list(&doc.children, inner, visited, diagnostics);
            }
            Err(IndexError::NotFound(_)) => {
                tracing::debug!(target = %target.display(), "sub-index not found");
                node.status = NodeStatus::Unresolved;
                diagnostics.push(Diagnostic::UnresolvedReference {
                    file: scope.file.to_path_buf(),
                    include: include.include.clone(),
                    target: target.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(target = %target.display(), error = %e, "malformed sub-index");
                node.status = NodeStatus::Malformed;
                diagnostics.push(Diagnostic::Malformed {
                    file: scope.file.to_path_buf(),
                    target: target.clone(),
                    message: e.to_string(),
                });
            }
        }
        Some(node)
    }
}

fn resolve_leaf(include: &IncludeRef, scope: Scope<'_>, diagnostics: &mut Vec<Diagnostic>) -> ResolvedNode {
    let target = normalize(&scope.base_dir.join(&include.include));
    let mut node = include_node(include, scope, NodeKind::Content, &target);
    node.filename = Some(slash_path(&normalize(Path::new(&include.include))));

    if !target.is_file() {
        tracing::debug!(target = %target.display(), "content include not found");
        node.status = NodeStatus::Unresolved;
        diagnostics.push(Diagnostic::UnresolvedReference {
            file: scope.file.to_path_buf(),
            include: include.include.clone(),
            target,
        });
    }
    node
}

/// Node for an include before its target is consulted
fn include_node(include: &IncludeRef, scope: Scope<'_>, kind: NodeKind, target: &Path) -> ResolvedNode {
    let meta = &include.meta;
    let default_type = match kind {
        NodeKind::SubIndex => DEFAULT_INDEX_TYPE,
        NodeKind::Inline | NodeKind::Content => DEFAULT_CONTENT_TYPE,
    };
    ResolvedNode {
        id: include.key().to_string(),
        node_type: meta.node_type.clone().unwrap_or_else(|| default_type.to_string()),
        name: meta.name.clone().unwrap_or_else(|| include.target_name()),
        summary: meta.summary.clone(),
        order: meta.order,
        kind,
        status: NodeStatus::Resolved,
        include: Some(include.include.clone()),
        filename: None,
        subindex_path: Some(target.to_path_buf()),
        parent_file: scope.file.to_path_buf(),
        parent_entity: scope.parent_entity.map(str::to_string),
        depth: scope.depth,
        children: Vec::new(),
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter(|c| *c != Component::CurDir)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn leaf_filename_is_normalized_include() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.codex.yaml", "children:\n  - include: ./notes/../notes/a.md\n");
        write(dir.path(), "notes/a.md", "# A\n");

        let store = IndexStore::new();
        let resolution = SubIndexResolver::new(&store)
            .resolve_file(&dir.path().join("index.codex.yaml"))
            .unwrap();
        let leaf = &resolution.children[0];
        assert_eq!(leaf.filename.as_deref(), Some("notes/a.md"));
        assert_eq!(leaf.kind, NodeKind::Content);
        assert_eq!(leaf.subindex_path.as_deref(), Some(normalize(&dir.path().join("notes/a.md")).as_path()));
        assert_eq!(resolution.outcome(), Outcome::Succeeded);
    }

    #[test]
    fn inline_children_record_parent_entity_and_depth() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "index.codex.yaml",
            "id: root\nchildren:\n  - id: act-1\n    name: Act 1\n    children:\n      - include: ./s.md\n",
        );
        write(dir.path(), "s.md", "");

        let store = IndexStore::new();
        let resolution = SubIndexResolver::new(&store)
            .resolve_file(&dir.path().join("index.codex.yaml"))
            .unwrap();
        let act = &resolution.children[0];
        assert_eq!(act.depth, 0);
        assert_eq!(act.parent_entity, None);
        let scene = &act.children[0];
        assert_eq!(scene.depth, 1);
        assert_eq!(scene.parent_entity.as_deref(), Some("act-1"));
    }

    #[test]
    fn malformed_sub_index_is_kept_and_siblings_resolve() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "index.codex.yaml",
            "children:\n  - include: ./bad/index.codex.yaml\n  - include: ./ok.md\n",
        );
        write(dir.path(), "bad/index.codex.yaml", "children: [unclosed\n");
        write(dir.path(), "ok.md", "");

        let store = IndexStore::new();
        let resolution = SubIndexResolver::new(&store)
            .resolve_file(&dir.path().join("index.codex.yaml"))
            .unwrap();
        assert_eq!(resolution.children[0].status, NodeStatus::Malformed);
        assert_eq!(resolution.children[0].filename.as_deref(), Some("bad"));
        assert_eq!(resolution.children[1].status, NodeStatus::Resolved);
        assert!(matches!(resolution.diagnostics[..], [Diagnostic::Malformed { .. }]));
    }

    #[test]
    fn diamond_includes_enter_each_index_once() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "index.codex.yaml",
            "children:\n  - include: ./a/index.codex.yaml\n  - include: ./shared/index.codex.yaml\n",
        );
        write(dir.path(), "a/index.codex.yaml", "children:\n  - include: ../shared/index.codex.yaml\n");
        write(dir.path(), "shared/index.codex.yaml", "children: []\n");

        let store = IndexStore::new();
        let resolution = SubIndexResolver::new(&store)
            .resolve_file(&dir.path().join("index.codex.yaml"))
            .unwrap();
        assert_eq!(resolution.children.len(), 1);
        assert_eq!(resolution.children[0].children.len(), 1);
        assert_eq!(resolution.diagnostics.len(), 1);
    }
}
