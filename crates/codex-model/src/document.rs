//! Index documents and their children
//!
//! [`RawIndex`] / [`RawChild`] mirror the on-disk shape shared by YAML and JSON
//! index files. [`IndexDocument`] / [`ChildNode`] are the typed view every
//! other component consumes: the "is this an include, and of what" question
//! is answered once, here, when the raw shape is converted.
//!
//! Keys this model does not know about (`metadata`, `author`, `attributes`,
//! ...) are kept in order in an `extra` map so rewriting a file never drops
//! authored data.

use crate::filename;
use crate::path::basename;
use crate::patterns::Patterns;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;

/// Unrecognised keys, in authored order
pub type Extra = IndexMap<String, Value>;

/// Document type used when an index omits `type`
pub const DEFAULT_INDEX_TYPE: &str = "index";

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// On-disk shape of an index file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIndex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Patterns>,
    #[serde(flatten)]
    pub extra: Extra,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<RawChild>,
}

/// On-disk shape of one entry in a `children` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(rename = "_filename", default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawChild>,
}

impl RawIndex {
    /// Include entries that also declare `children`
    ///
    /// Those children are not representable (an include's contents live in the
    /// target) and are dropped on conversion; callers may want to warn.
    #[must_use]
    pub fn includes_with_children(&self) -> Vec<String> {
        fn walk(list: &[RawChild], out: &mut Vec<String>) {
            for child in list {
                match &child.include {
                    Some(include) if !child.children.is_empty() => out.push(include.clone()),
                    Some(_) => {}
                    None => walk(&child.children, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &mut out);
        out
    }
}

/// Display metadata an include entry may carry inline
///
/// Anything set here overrides what the include target declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    pub id: Option<String>,
    pub node_type: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub order: Option<i64>,
    pub extra: Extra,
}

/// `include:` reference to a content file or another index
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeRef {
    /// Path relative to the containing index file's directory
    pub include: String,
    /// Inline overrides
    pub meta: NodeMeta,
}

impl IncludeRef {
    /// Reference without overrides
    #[must_use]
    pub fn new(include: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            meta: NodeMeta::default(),
        }
    }

    /// Stable key: declared id, else the include string
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        self.meta.id.as_deref().unwrap_or(&self.include)
    }

    /// Whether the target is an index file
    #[inline]
    #[must_use]
    pub fn targets_index(&self) -> bool {
        filename::is_index_file(Path::new(&self.include))
    }

    /// Name derived from the target path alone
    ///
    /// Sub-indexes are named after their directory, content files after their
    /// file stem.
    #[must_use]
    pub fn target_name(&self) -> String {
        let path = Path::new(&self.include);
        let derived = if self.targets_index() {
            path.parent().map(basename).unwrap_or_default()
        } else {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        if derived.is_empty() || derived == "." {
            self.include.clone()
        } else {
            derived
        }
    }
}

/// Node defined directly in an index file
#[derive(Debug, Clone, PartialEq)]
pub struct InlineNode {
    pub id: String,
    pub node_type: String,
    pub name: String,
    pub summary: Option<String>,
    pub order: Option<i64>,
    /// Authored `_filename`, used by generated caches for content files
    pub filename: Option<String>,
    pub children: Vec<ChildNode>,
    pub extra: Extra,
}

impl InlineNode {
    /// Create an inline node without children
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            name: name.into(),
            summary: None,
            order: None,
            filename: None,
            children: Vec::new(),
            extra: Extra::new(),
        }
    }

    /// Add a child, returning self
    #[must_use]
    pub fn with_child(mut self, child: ChildNode) -> Self {
        self.children.push(child);
        self
    }
}

/// One entry of a `children` list, already classified
#[derive(Debug, Clone, PartialEq)]
pub enum ChildNode {
    /// Node defined in place
    Inline(InlineNode),
    /// Include of a content file
    Leaf(IncludeRef),
    /// Include of another index file
    SubIndex(IncludeRef),
}

impl ChildNode {
    /// Include entry, classified by the target's file name
    #[must_use]
    pub fn include(path: impl Into<String>) -> Self {
        Self::from_include(IncludeRef::new(path))
    }

    /// Classify an include reference
    #[must_use]
    pub fn from_include(include: IncludeRef) -> Self {
        if include.targets_index() {
            Self::SubIndex(include)
        } else {
            Self::Leaf(include)
        }
    }

    /// Stable key used to address the entry
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Inline(node) => &node.id,
            Self::Leaf(include) | Self::SubIndex(include) => include.key(),
        }
    }

    /// Include reference (if this is an include)
    #[inline]
    #[must_use]
    pub fn include_ref(&self) -> Option<&IncludeRef> {
        match self {
            Self::Inline(_) => None,
            Self::Leaf(include) | Self::SubIndex(include) => Some(include),
        }
    }

    /// Mutable include reference
    #[inline]
    pub fn include_ref_mut(&mut self) -> Option<&mut IncludeRef> {
        match self {
            Self::Inline(_) => None,
            Self::Leaf(include) | Self::SubIndex(include) => Some(include),
        }
    }

    /// Explicit order key
    #[must_use]
    pub fn order(&self) -> Option<i64> {
        match self {
            Self::Inline(node) => node.order,
            Self::Leaf(include) | Self::SubIndex(include) => include.meta.order,
        }
    }

    /// Set or clear the explicit order key
    pub fn set_order(&mut self, order: Option<i64>) {
        match self {
            Self::Inline(node) => node.order = order,
            Self::Leaf(include) | Self::SubIndex(include) => include.meta.order = order,
        }
    }

    /// Name shown for the entry before any include is resolved
    #[must_use]
    pub fn display_name(&self) -> Cow<'_, str> {
        match self {
            Self::Inline(node) => Cow::Borrowed(&node.name),
            Self::Leaf(include) | Self::SubIndex(include) => match &include.meta.name {
                Some(name) => Cow::Borrowed(name),
                None => Cow::Owned(include.target_name()),
            },
        }
    }

    /// Nested children (empty for includes)
    #[must_use]
    pub fn children(&self) -> &[ChildNode] {
        match self {
            Self::Inline(node) => &node.children,
            Self::Leaf(_) | Self::SubIndex(_) => &[],
        }
    }

    /// Nested children list (only inline nodes have one)
    pub fn children_mut(&mut self) -> Option<&mut Vec<ChildNode>> {
        match self {
            Self::Inline(node) => Some(&mut node.children),
            Self::Leaf(_) | Self::SubIndex(_) => None,
        }
    }

    /// Whether `key` names this entry or anything nested in it
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.key() == key || self.children().iter().any(|c| c.contains_key(key))
    }

    /// Every include reference in this entry's subtree
    #[must_use]
    pub fn includes(&self) -> Vec<&IncludeRef> {
        let mut out = Vec::new();
        collect_includes(std::slice::from_ref(self), &mut out);
        out
    }

    /// Every include reference in this entry's subtree, mutably
    pub fn includes_mut(&mut self) -> Vec<&mut IncludeRef> {
        let mut out = Vec::new();
        collect_includes_mut(std::slice::from_mut(self), &mut out);
        out
    }

    fn from_raw(raw: RawChild, position: usize) -> Self {
        let RawChild {
            id,
            node_type,
            name,
            summary,
            order,
            include,
            filename,
            extra,
            children,
        } = raw;

        if let Some(include) = include {
            return Self::from_include(IncludeRef {
                include,
                meta: NodeMeta {
                    id,
                    node_type,
                    name,
                    summary,
                    order,
                    extra,
                },
            });
        }

        let id = id
            .or_else(|| name.as_deref().map(slugify))
            .unwrap_or_else(|| format!("node-{}", position + 1));
        let node_type = node_type.unwrap_or_else(|| {
            if children.is_empty() { "document" } else { "folder" }.to_string()
        });
        let name = name.unwrap_or_else(|| id.clone());

        Self::Inline(InlineNode {
            id,
            node_type,
            name,
            summary,
            order,
            filename,
            children: children_from_raw(children),
            extra,
        })
    }

    /// Convert back to the on-disk shape
    #[must_use]
    pub fn to_raw(&self) -> RawChild {
        match self {
            Self::Inline(node) => RawChild {
                id: Some(node.id.clone()),
                node_type: Some(node.node_type.clone()),
                name: Some(node.name.clone()),
                summary: node.summary.clone(),
                order: node.order,
                include: None,
                filename: node.filename.clone(),
                extra: node.extra.clone(),
                children: node.children.iter().map(Self::to_raw).collect(),
            },
            Self::Leaf(include) | Self::SubIndex(include) => RawChild {
                id: include.meta.id.clone(),
                node_type: include.meta.node_type.clone(),
                name: include.meta.name.clone(),
                summary: include.meta.summary.clone(),
                order: include.meta.order,
                include: Some(include.include.clone()),
                filename: None,
                extra: include.meta.extra.clone(),
                children: Vec::new(),
            },
        }
    }
}

fn children_from_raw(raw: Vec<RawChild>) -> Vec<ChildNode> {
    raw.into_iter()
        .enumerate()
        .map(|(position, child)| ChildNode::from_raw(child, position))
        .collect()
}

fn collect_includes<'a>(list: &'a [ChildNode], out: &mut Vec<&'a IncludeRef>) {
    for child in list {
        match child {
            ChildNode::Inline(node) => collect_includes(&node.children, out),
            ChildNode::Leaf(include) | ChildNode::SubIndex(include) => out.push(include),
        }
    }
}

fn collect_includes_mut<'a>(list: &'a mut [ChildNode], out: &mut Vec<&'a mut IncludeRef>) {
    for child in list {
        match child {
            ChildNode::Inline(node) => collect_includes_mut(&mut node.children, out),
            ChildNode::Leaf(include) | ChildNode::SubIndex(include) => out.push(include),
        }
    }
}

fn find_inline_mut<'a>(list: &'a mut [ChildNode], id: &str) -> Option<&'a mut InlineNode> {
    for child in list {
        if let ChildNode::Inline(node) = child {
            if node.id == id {
                return Some(node);
            }
            if let Some(found) = find_inline_mut(&mut node.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_inline<'a>(list: &'a [ChildNode], id: &str) -> Option<&'a InlineNode> {
    for child in list {
        if let ChildNode::Inline(node) = child {
            if node.id == id {
                return Some(node);
            }
            if let Some(found) = find_inline(&node.children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Where an entry sits inside one index file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Containing inline node, `None` for the document's own list
    pub parent: Option<String>,
    /// Position within that list
    pub index: usize,
}

/// One index file, typed
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    pub id: String,
    pub node_type: String,
    pub name: String,
    pub summary: Option<String>,
    pub patterns: Option<Patterns>,
    pub children: Vec<ChildNode>,
    pub extra: Extra,
}

impl IndexDocument {
    /// Create an empty document
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            name: name.into(),
            summary: None,
            patterns: None,
            children: Vec::new(),
            extra: Extra::new(),
        }
    }

    /// Empty document with identity derived from the file's directory
    #[must_use]
    pub fn empty_for(origin: &Path) -> Self {
        Self::from_raw(RawIndex::default(), origin)
    }

    /// Convert the on-disk shape, filling omitted identity from `origin`
    ///
    /// `id` falls back to the slug of the directory name, `name` to the
    /// directory name, `type` to [`DEFAULT_INDEX_TYPE`].
    #[must_use]
    pub fn from_raw(raw: RawIndex, origin: &Path) -> Self {
        let dir_name = origin
            .parent()
            .map(basename)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "root".to_string());

        Self {
            id: raw.id.unwrap_or_else(|| slugify(&dir_name)),
            node_type: raw.node_type.unwrap_or_else(|| DEFAULT_INDEX_TYPE.to_string()),
            name: raw.name.unwrap_or(dir_name),
            summary: raw.summary,
            patterns: raw.patterns,
            children: children_from_raw(raw.children),
            extra: raw.extra,
        }
    }

    /// Convert back to the on-disk shape
    #[must_use]
    pub fn to_raw(&self) -> RawIndex {
        RawIndex {
            id: Some(self.id.clone()),
            node_type: Some(self.node_type.clone()),
            name: Some(self.name.clone()),
            summary: self.summary.clone(),
            patterns: self.patterns.clone(),
            extra: self.extra.clone(),
            children: self.children.iter().map(ChildNode::to_raw).collect(),
        }
    }

    /// Add a child, returning self
    #[must_use]
    pub fn with_child(mut self, child: ChildNode) -> Self {
        self.children.push(child);
        self
    }

    /// Whether `entity` addresses this document's own list
    #[inline]
    #[must_use]
    pub fn is_root_entity(&self, entity: Option<&str>) -> bool {
        entity.map_or(true, |e| e == self.id)
    }

    /// Children list addressed by entity id (`None` or the document id for
    /// the top-level list, otherwise an inline node's id)
    #[must_use]
    pub fn list(&self, entity: Option<&str>) -> Option<&[ChildNode]> {
        match entity {
            Some(id) if id != self.id => find_inline(&self.children, id).map(|n| n.children.as_slice()),
            _ => Some(&self.children),
        }
    }

    /// Mutable children list addressed by entity id
    pub fn list_mut(&mut self, entity: Option<&str>) -> Option<&mut Vec<ChildNode>> {
        match entity {
            Some(id) if id != self.id => find_inline_mut(&mut self.children, id).map(|n| &mut n.children),
            _ => Some(&mut self.children),
        }
    }

    /// Find an entry anywhere in the document by key
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&ChildNode> {
        fn walk<'a>(list: &'a [ChildNode], key: &str) -> Option<&'a ChildNode> {
            for child in list {
                if child.key() == key {
                    return Some(child);
                }
                if let Some(found) = walk(child.children(), key) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.children, key)
    }

    /// Locate an entry by key: its containing list and position
    #[must_use]
    pub fn locate(&self, key: &str) -> Option<Location> {
        fn walk(list: &[ChildNode], parent: Option<&str>, key: &str) -> Option<Location> {
            for (index, child) in list.iter().enumerate() {
                if child.key() == key {
                    return Some(Location {
                        parent: parent.map(str::to_string),
                        index,
                    });
                }
                if let ChildNode::Inline(node) = child {
                    if let Some(found) = walk(&node.children, Some(&node.id), key) {
                        return Some(found);
                    }
                }
            }
            None
        }
        walk(&self.children, None, key)
    }

    /// Every include reference in the document
    #[must_use]
    pub fn includes(&self) -> Vec<&IncludeRef> {
        let mut out = Vec::new();
        collect_includes(&self.children, &mut out);
        out
    }
}

/// Filesystem-safe identifier from free text
///
/// Lowercases, drops punctuation, and collapses whitespace, `-` and `_` runs
/// into single hyphens. Empty results become `untitled`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_include(path: &str) -> RawChild {
        RawChild {
            include: Some(path.to_string()),
            ..RawChild::default()
        }
    }

    #[test]
    fn includes_are_classified_by_file_name() {
        assert!(matches!(ChildNode::include("./book-1/index.codex.yaml"), ChildNode::SubIndex(_)));
        assert!(matches!(ChildNode::include("./book-1/.index.codex.json"), ChildNode::SubIndex(_)));
        assert!(matches!(ChildNode::include("./chapter-01.md"), ChildNode::Leaf(_)));
    }

    #[test]
    fn document_identity_defaults_from_directory() {
        let doc = IndexDocument::empty_for(Path::new("/ws/My Book/index.codex.yaml"));
        assert_eq!(doc.id, "my-book");
        assert_eq!(doc.name, "My Book");
        assert_eq!(doc.node_type, DEFAULT_INDEX_TYPE);
    }

    #[test]
    fn inline_defaults_follow_name_then_position() {
        let raw = RawIndex {
            children: vec![
                RawChild {
                    name: Some("Act One".into()),
                    children: vec![raw_include("./a.md")],
                    ..RawChild::default()
                },
                RawChild::default(),
            ],
            ..RawIndex::default()
        };
        let doc = IndexDocument::from_raw(raw, Path::new("/ws/index.codex.yaml"));

        let ChildNode::Inline(act) = &doc.children[0] else { panic!("expected inline") };
        assert_eq!(act.id, "act-one");
        assert_eq!(act.node_type, "folder");

        let ChildNode::Inline(bare) = &doc.children[1] else { panic!("expected inline") };
        assert_eq!(bare.id, "node-2");
        assert_eq!(bare.name, "node-2");
        assert_eq!(bare.node_type, "document");
    }

    #[test]
    fn include_overrides_survive_round_trip() {
        let mut raw = raw_include("./book-1/index.codex.yaml");
        raw.name = Some("Book One".into());
        raw.order = Some(3);
        raw.extra.insert("summary_note".into(), Value::String("kept".into()));

        let doc = IndexDocument::from_raw(
            RawIndex {
                children: vec![raw.clone()],
                ..RawIndex::default()
            },
            Path::new("/ws/index.codex.yaml"),
        );
        assert_eq!(doc.children[0].display_name(), "Book One");
        assert_eq!(doc.children[0].order(), Some(3));
        assert_eq!(doc.to_raw().children[0], raw);
    }

    #[test]
    fn include_key_prefers_declared_id() {
        let mut include = IncludeRef::new("./a.md");
        assert_eq!(include.key(), "./a.md");
        include.meta.id = Some("scene-a".into());
        assert_eq!(include.key(), "scene-a");
    }

    #[test]
    fn target_names() {
        assert_eq!(IncludeRef::new("./book-1/index.codex.yaml").target_name(), "book-1");
        assert_eq!(IncludeRef::new("./chapter-01.md").target_name(), "chapter-01");
        assert_eq!(IncludeRef::new("index.codex.yaml").target_name(), "index.codex.yaml");
    }

    #[test]
    fn lists_are_addressed_by_entity() {
        let doc = IndexDocument::new("root", "index", "Root")
            .with_child(ChildNode::Inline(
                InlineNode::new("act-1", "act", "Act 1").with_child(ChildNode::include("./s1.md")),
            ))
            .with_child(ChildNode::include("./notes.md"));

        assert_eq!(doc.list(None).unwrap().len(), 2);
        assert_eq!(doc.list(Some("root")).unwrap().len(), 2);
        assert_eq!(doc.list(Some("act-1")).unwrap().len(), 1);
        assert!(doc.list(Some("missing")).is_none());

        let loc = doc.locate("./s1.md").unwrap();
        assert_eq!(loc.parent.as_deref(), Some("act-1"));
        assert_eq!(loc.index, 0);
        assert_eq!(doc.includes().len(), 2);
    }

    #[test]
    fn stray_include_children_are_reported() {
        let mut include = raw_include("./a.md");
        include.children = vec![RawChild::default()];
        let raw = RawIndex {
            children: vec![include],
            ..RawIndex::default()
        };
        assert_eq!(raw.includes_with_children(), vec!["./a.md".to_string()]);
    }

    #[test]
    fn slugify_matches_generator_rules() {
        assert_eq!(slugify("Book One!"), "book-one");
        assert_eq!(slugify("  a - b__c "), "a-b-c");
        assert_eq!(slugify("Don't Panic"), "dont-panic");
        assert_eq!(slugify("???"), "untitled");
    }
}
