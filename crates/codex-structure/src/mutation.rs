//! Structure mutation operations
//!
//! Surgical edits to one children list of one index file. Every operation
//! loads only the files its [`ParentRef`]s name, validates the whole edit in
//! memory, and writes nothing when validation fails. Regenerating the
//! affected folders afterwards is the cascade's job; a [`MutationReceipt`]
//! says where to start it.
//!
//! # Placement
//!
//! A list without order keys is ordered by array position, so placing an
//! entry only moves it in the array. Once any sibling carries a key the list
//! is first put in policy order, the entry is placed, and every sibling is
//! re-keyed `1..=n` so the stored keys agree with the requested position.

use crate::error::{MutationError, MutationResult, ValidationError};
use crate::rebase::rebase_node;
use codex_index::{IndexError, IndexStore, Outcome};
use codex_model::ordering::{sort_siblings, OrderMode, UNORDERED};
use codex_model::path::{absolutize, is_within, normalize};
use codex_model::{ChildNode, IndexDocument};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Addresses one children list: an index file's own list, or the list of an
/// inline node inside it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentRef {
    /// Index file holding the list
    pub file: PathBuf,
    /// Inline node owning the list; `None` (or the document id) for the
    /// file's own list
    pub entity: Option<String>,
}

impl ParentRef {
    /// The file's own children list
    #[must_use]
    pub fn root(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            entity: None,
        }
    }

    /// The children list of inline node `entity`
    #[must_use]
    pub fn entity(file: impl Into<PathBuf>, entity: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            entity: Some(entity.into()),
        }
    }

    /// Directory the list's includes are relative to
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.file.parent().unwrap_or_else(|| Path::new("/"))
    }

    fn absolute(&self) -> Result<Self, IndexError> {
        Ok(Self {
            file: absolutize(&self.file).map_err(|e| IndexError::io(&self.file, e))?,
            entity: self.entity.clone(),
        })
    }
}

impl Display for ParentRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "{}#{entity}", self.file.display()),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// Kind of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Insert,
    Remove,
    Move,
    Reorder,
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::Move => "move",
            Self::Reorder => "reorder",
        })
    }
}

/// One structure edit
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    /// Add `node` to a list at `position` (clamped to the list length)
    ///
    /// Fails if the file already declares any id of the node's subtree or
    /// already includes any file the subtree includes.
    Insert {
        parent: ParentRef,
        node: ChildNode,
        position: usize,
    },

    /// Remove the entry `key` from a list
    Remove { parent: ParentRef, key: String },

    /// Move the entry `key` between lists, possibly across files
    ///
    /// Fails if the destination lies inside the moved entry.
    Move {
        key: String,
        from: ParentRef,
        to: ParentRef,
        position: usize,
    },

    /// Move the entry `key` to `position` within its own list
    Reorder {
        parent: ParentRef,
        key: String,
        position: usize,
    },
}

impl MutationOp {
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Insert { .. } => MutationKind::Insert,
            Self::Remove { .. } => MutationKind::Remove,
            Self::Move { .. } => MutationKind::Move,
            Self::Reorder { .. } => MutationKind::Reorder,
        }
    }

    /// Key of the entry the operation is about
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Insert { node, .. } => node.key(),
            Self::Remove { key, .. } | Self::Move { key, .. } | Self::Reorder { key, .. } => key,
        }
    }
}

/// What a successful mutation touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReceipt {
    pub kind: MutationKind,
    pub key: String,
    /// Index files rewritten (or found already identical), in write order
    pub touched: Vec<PathBuf>,
    /// How many of those actually changed on disk
    pub written: usize,
}

impl MutationReceipt {
    /// Folders a cascade should start from, without duplicates
    #[must_use]
    pub fn folders(&self) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = Vec::new();
        for file in &self.touched {
            if let Some(dir) = file.parent() {
                if !folders.iter().any(|f| f == dir) {
                    folders.push(dir.to_path_buf());
                }
            }
        }
        folders
    }
}

/// One entry of a [`BatchReport`]
#[derive(Debug)]
pub struct BatchItem {
    /// Position of the operation in the batch
    pub index: usize,
    pub kind: MutationKind,
    pub key: String,
    pub result: MutationResult<MutationReceipt>,
}

/// Per-item results of a best-effort batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Receipts of the operations that went through
    pub fn succeeded(&self) -> impl Iterator<Item = &MutationReceipt> {
        self.items.iter().filter_map(|item| item.result.as_ref().ok())
    }

    /// Items that failed, with their errors
    pub fn failed(&self) -> impl Iterator<Item = (&BatchItem, &MutationError)> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().err().map(|e| (item, e)))
    }

    /// Cascade start folders of every successful item, without duplicates
    #[must_use]
    pub fn folders(&self) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = Vec::new();
        for folder in self.succeeded().flat_map(MutationReceipt::folders) {
            if !folders.contains(&folder) {
                folders.push(folder);
            }
        }
        folders
    }

    /// `Rejected` when every item failed, otherwise one diagnostic per
    /// failed item
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        let failed: Vec<_> = self.failed().collect();
        match failed.first() {
            Some((_, err)) if failed.len() == self.items.len() => Outcome::Rejected(err.to_string()),
            _ => Outcome::from_count(failed.len()),
        }
    }
}

/// Applies [`MutationOp`]s to index files through an [`IndexStore`]
#[derive(Debug, Clone, Copy)]
pub struct StructureEditor<'s> {
    store: &'s IndexStore,
}

impl<'s> StructureEditor<'s> {
    #[inline]
    #[must_use]
    pub fn new(store: &'s IndexStore) -> Self {
        Self { store }
    }

    /// Apply one operation
    ///
    /// # Errors
    /// [`MutationError::Validation`] if the edit is refused (nothing is
    /// written), [`MutationError::Index`] on load or write failure
    pub fn apply(&self, op: &MutationOp) -> MutationResult<MutationReceipt> {
        match op {
            MutationOp::Insert { parent, node, position } => self.insert(parent, node.clone(), *position),
            MutationOp::Remove { parent, key } => self.remove(parent, key).map(|(receipt, _)| receipt),
            MutationOp::Move { key, from, to, position } => self.move_node(key, from, to, *position),
            MutationOp::Reorder { parent, key, position } => self.reorder(parent, key, *position),
        }
    }

    /// Apply each operation independently, in order
    ///
    /// A failed item does not stop the ones after it.
    #[must_use]
    pub fn apply_batch(&self, ops: &[MutationOp]) -> BatchReport {
        let items = ops
            .iter()
            .enumerate()
            .map(|(index, op)| {
                let result = self.apply(op);
                if let Err(e) = &result {
                    tracing::warn!(index, op = %op.kind(), key = op.key(), error = %e, "batch item failed");
                }
                BatchItem {
                    index,
                    kind: op.kind(),
                    key: op.key().to_string(),
                    result,
                }
            })
            .collect();
        BatchReport { items }
    }

    /// Insert `node` into a list
    ///
    /// # Errors
    /// Rejects unknown parent entities, ids already declared in the file,
    /// and includes of files the file already includes
    pub fn insert(&self, parent: &ParentRef, node: ChildNode, position: usize) -> MutationResult<MutationReceipt> {
        let parent = parent.absolute()?;
        let mut doc = self.store.load(&parent.file)?.document;

        reject_duplicates(&doc, &node, &parent)?;
        let key = node.key().to_string();
        let list = list_mut(&mut doc, &parent)?;
        place(list, node, position);

        let written = self.write(&parent.file, &doc)?;
        tracing::debug!(parent = %parent, key = %key, "node inserted");
        Ok(MutationReceipt {
            kind: MutationKind::Insert,
            key,
            touched: vec![parent.file],
            written,
        })
    }

    /// Remove an entry from a list, returning it with the receipt
    ///
    /// # Errors
    /// Rejects unknown parent entities and keys not in the list
    pub fn remove(&self, parent: &ParentRef, key: &str) -> MutationResult<(MutationReceipt, ChildNode)> {
        let parent = parent.absolute()?;
        let mut doc = self.store.load(&parent.file)?.document;

        let list = list_mut(&mut doc, &parent)?;
        let index = position_of(list, key, &parent.file)?;
        let removed = list.remove(index);

        let written = self.write(&parent.file, &doc)?;
        tracing::debug!(parent = %parent, key, "node removed");
        let receipt = MutationReceipt {
            kind: MutationKind::Remove,
            key: key.to_string(),
            touched: vec![parent.file],
            written,
        };
        Ok((receipt, removed))
    }

    /// Move an entry to `position` within its own list
    ///
    /// # Errors
    /// Rejects unknown parent entities and keys not in the list
    pub fn reorder(&self, parent: &ParentRef, key: &str, position: usize) -> MutationResult<MutationReceipt> {
        let parent = parent.absolute()?;
        let mut doc = self.store.load(&parent.file)?.document;

        let list = list_mut(&mut doc, &parent)?;
        if OrderMode::of(list) == OrderMode::Keyed {
            sort_siblings(list);
        }
        let index = position_of(list, key, &parent.file)?;
        let node = list.remove(index);
        place(list, node, position);

        let written = self.write(&parent.file, &doc)?;
        tracing::debug!(parent = %parent, key, position, "node reordered");
        Ok(MutationReceipt {
            kind: MutationKind::Reorder,
            key: key.to_string(),
            touched: vec![parent.file],
            written,
        })
    }

    /// Move an entry between lists
    ///
    /// Across directories every include in the moved subtree is rebased so
    /// it names the same file from its new index. Across files the
    /// destination is written before the source, so an interruption can
    /// duplicate the entry but never lose it.
    ///
    /// # Errors
    /// Rejects moves into the entry itself or its descendants, unknown
    /// entities, unknown keys, and ids or include targets already present in
    /// a different destination file
    pub fn move_node(
        &self,
        key: &str,
        from: &ParentRef,
        to: &ParentRef,
        position: usize,
    ) -> MutationResult<MutationReceipt> {
        let from = from.absolute()?;
        let to = to.absolute()?;
        let mut source = self.store.load(&from.file)?.document;

        let from_list = source
            .list(from.entity.as_deref())
            .ok_or_else(|| unknown_entity(&from))?;
        let index = position_of(from_list, key, &from.file)?;
        let mut node = from_list[index].clone();

        if from.file == to.file {
            if let Some(entity) = to.entity.as_deref().filter(|e| *e != source.id) {
                if node.contains_key(entity) {
                    return Err(ValidationError::MoveIntoDescendant { key: key.to_string() }.into());
                }
            }
            if source.list(to.entity.as_deref()).is_none() {
                return Err(unknown_entity(&to).into());
            }

            list_mut(&mut source, &from)?.remove(index);
            place(list_mut(&mut source, &to)?, node, position);
            let written = self.write(&from.file, &source)?;
            tracing::debug!(key, from = %from, to = %to, "node moved within file");
            return Ok(MutationReceipt {
                kind: MutationKind::Move,
                key: key.to_string(),
                touched: vec![from.file],
                written,
            });
        }

        reject_move_into_claimed(&node, key, from.dir(), to.dir())?;

        let mut destination = self.store.load(&to.file)?.document;
        let rebased = rebase_node(&mut node, from.dir(), to.dir())?;
        reject_duplicates(&destination, &node, &to)?;
        place(list_mut(&mut destination, &to)?, node, position);
        list_mut(&mut source, &from)?.remove(index);

        let mut written = self.write(&to.file, &destination)?;
        written += self.write(&from.file, &source)?;
        tracing::debug!(key, from = %from, to = %to, rebased, "node moved across files");
        Ok(MutationReceipt {
            kind: MutationKind::Move,
            key: key.to_string(),
            touched: vec![to.file, from.file],
            written,
        })
    }

    fn write(&self, path: &Path, doc: &IndexDocument) -> MutationResult<usize> {
        let outcome = self.store.save(path, doc)?;
        Ok(usize::from(outcome.is_written()))
    }
}

/// Put `node` at `position` (clamped), re-keying keyed lists `1..=n`
fn place(list: &mut Vec<ChildNode>, node: ChildNode, position: usize) {
    let keyed = node.order().is_some() || OrderMode::of(list) == OrderMode::Keyed;
    if keyed {
        sort_siblings(list);
    }
    list.insert(position.min(list.len()), node);
    if keyed {
        for (i, sibling) in list.iter_mut().enumerate() {
            sibling.set_order(Some(i64::try_from(i + 1).unwrap_or(UNORDERED)));
        }
    }
}

fn list_mut<'d>(doc: &'d mut IndexDocument, parent: &ParentRef) -> Result<&'d mut Vec<ChildNode>, ValidationError> {
    doc.list_mut(parent.entity.as_deref())
        .ok_or_else(|| unknown_entity(parent))
}

fn unknown_entity(parent: &ParentRef) -> ValidationError {
    ValidationError::UnknownEntity {
        entity: parent.entity.clone().unwrap_or_default(),
        file: parent.file.clone(),
    }
}

fn position_of(list: &[ChildNode], key: &str, file: &Path) -> Result<usize, ValidationError> {
    list.iter()
        .position(|c| c.key() == key)
        .ok_or_else(|| ValidationError::NodeNotFound {
            key: key.to_string(),
            file: file.to_path_buf(),
        })
}

/// Ids declared anywhere in a list: inline node ids and include ids
fn declared_ids(list: &[ChildNode]) -> Vec<&str> {
    let mut ids = Vec::new();
    for child in list {
        match child {
            ChildNode::Inline(node) => ids.push(node.id.as_str()),
            ChildNode::Leaf(include) | ChildNode::SubIndex(include) => ids.extend(include.meta.id.as_deref()),
        }
        ids.extend(declared_ids(child.children()));
    }
    ids
}

/// Absolute targets of every include in a list, with the include strings
fn include_targets<'n>(list: &'n [ChildNode], dir: &Path) -> Vec<(PathBuf, &'n str)> {
    list.iter()
        .flat_map(ChildNode::includes)
        .map(|include| (normalize(&dir.join(&include.include)), include.include.as_str()))
        .collect()
}

/// `node` must already be relative to `parent`'s folder
fn reject_duplicates(doc: &IndexDocument, node: &ChildNode, parent: &ParentRef) -> Result<(), ValidationError> {
    let duplicate = |key: &str| ValidationError::DuplicateKey {
        key: key.to_string(),
        file: parent.file.clone(),
    };
    let subtree = std::slice::from_ref(node);

    let ids = declared_ids(&doc.children);
    if let Some(id) = declared_ids(subtree).into_iter().find(|id| ids.contains(id)) {
        return Err(duplicate(id));
    }

    let targets: HashSet<PathBuf> = include_targets(&doc.children, parent.dir())
        .into_iter()
        .map(|(target, _)| target)
        .collect();
    match include_targets(subtree, parent.dir())
        .into_iter()
        .find(|(target, _)| targets.contains(target))
    {
        Some((_, include)) => Err(duplicate(include)),
        None => Ok(()),
    }
}

/// A node claims the folder of every sub-index in its subtree; it cannot be
/// moved into an index inside one of those folders
fn reject_move_into_claimed(node: &ChildNode, key: &str, from_dir: &Path, to_dir: &Path) -> Result<(), ValidationError> {
    let claims = node
        .includes()
        .into_iter()
        .filter(|include| include.targets_index())
        .filter_map(|include| normalize(&from_dir.join(&include.include)).parent().map(Path::to_path_buf));

    for claimed in claims {
        if is_within(to_dir, &claimed) {
            return Err(ValidationError::MoveIntoDescendant { key: key.to_string() });
        }
    }
    Ok(())
}
