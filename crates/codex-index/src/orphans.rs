//! Master index custody
//!
//! A master (root) index directly owns only the content files no nested
//! sub-index claims. [`discover_sub_indexes`] finds the sub-indexes on disk,
//! [`compute_orphans`] filters the master's content includes down to the
//! unclaimed ones, and [`OrphanTracker`] recomputes whenever the discovered
//! set changes.

use crate::error::{IndexError, IndexResult};
use crate::resolver::SubIndexResolver;
use crate::store::IndexStore;
use codex_model::filename;
use codex_model::path::{absolutize, normalize};
use codex_model::{for_each_with_chain, ChildNode, ContentHash, IndexDocument, IndexFileKind, NodeKind};
use ignore::WalkBuilder;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Index file found on disk, one per directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredIndex {
    /// Absolute path of the index file
    pub path: PathBuf,
    pub kind: IndexFileKind,
}

impl DiscoveredIndex {
    /// Directory the index covers
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }
}

/// A master content include that no sub-index claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    /// Key of the entry in the master index
    pub key: String,
    /// Include string as authored
    pub include: String,
    /// Absolute, normalised target path
    pub path: PathBuf,
    /// Inline node holding the entry, `None` for the master's own list
    pub parent_entity: Option<String>,
}

/// Find every index file under `root_dir` except the master's
///
/// Hidden files are visited and ignore files are not honoured: generated
/// indexes are dot-prefixed and must be found. Where a directory holds
/// several index files, the lookup precedence picks one.
///
/// # Errors
/// Returns error if the root cannot be walked
pub fn discover_sub_indexes(root_dir: &Path, master_path: &Path) -> IndexResult<Vec<DiscoveredIndex>> {
    let root_dir = absolutize(root_dir).map_err(|e| IndexError::io(root_dir, e))?;
    let master_dir = absolutize(master_path)
        .map_err(|e| IndexError::io(master_path, e))?
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let walker = WalkBuilder::new(&root_dir)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    // dir -> (precedence rank, index)
    let mut per_dir: BTreeMap<PathBuf, (usize, DiscoveredIndex)> = BTreeMap::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = normalize(entry.path());
        let Some(kind) = filename::classify(&path) else {
            continue;
        };
        let Some(dir) = path.parent().map(Path::to_path_buf) else {
            continue;
        };
        if dir == master_dir {
            continue;
        }

        let rank = filename::INDEX_FILE_NAMES
            .iter()
            .position(|n| path.file_name().is_some_and(|f| f == *n))
            .unwrap_or(usize::MAX);
        let candidate = (rank, DiscoveredIndex { path, kind });
        match per_dir.get(&dir) {
            Some((existing, _)) if *existing <= rank => {}
            _ => {
                per_dir.insert(dir, candidate);
            }
        }
    }

    let found: Vec<DiscoveredIndex> = per_dir.into_values().map(|(_, index)| index).collect();
    tracing::debug!(root = %root_dir.display(), count = found.len(), "sub-indexes discovered");
    Ok(found)
}

/// Master content includes that no discovered sub-index claims
///
/// A sub-index claims its own directory and, transitively, every path it
/// includes. Comparison is on absolute normalised paths; a claimed
/// directory claims everything beneath it. Sub-index includes in the master
/// are the claiming mechanism and are never orphans.
#[must_use]
pub fn compute_orphans(
    master: &IndexDocument,
    master_path: &Path,
    sub_indexes: &[DiscoveredIndex],
    store: &IndexStore,
) -> Vec<ChildRef> {
    let master_path = absolutize(master_path).unwrap_or_else(|_| normalize(master_path));
    let master_dir = master_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut covered = covered_paths(sub_indexes, &master_path, store);
    covered.retain(|c| *c != master_dir);

    let mut seen = HashSet::new();
    let mut orphans = Vec::new();
    collect_orphans(&master.children, None, &master_dir, &covered, &mut seen, &mut orphans);
    orphans
}

/// Every path the sub-indexes claim
///
/// Each sub-index is resolved with the master already visited, so an
/// include of the master back is a circular reference, not a claim.
fn covered_paths(sub_indexes: &[DiscoveredIndex], master_path: &Path, store: &IndexStore) -> Vec<PathBuf> {
    let resolver = SubIndexResolver::new(store);
    let mut covered = Vec::new();

    for index in sub_indexes {
        let dir = normalize(index.dir());
        covered.push(dir.clone());
        match store.load(&index.path) {
            Ok(loaded) => {
                let mut visited = HashSet::from([master_path.to_path_buf(), normalize(&index.path)]);
                let mut diagnostics = Vec::new();
                let children = resolver.resolve(&loaded.document, &index.path, &dir, &mut visited, &mut diagnostics);
                for_each_with_chain(&children, |node, _| {
                    if let Some(target) = &node.subindex_path {
                        covered.push(match node.kind {
                            NodeKind::SubIndex => target.parent().map_or_else(|| target.clone(), Path::to_path_buf),
                            NodeKind::Inline | NodeKind::Content => target.clone(),
                        });
                    }
                });
            }
            Err(e) => {
                tracing::warn!(index = %index.path.display(), error = %e, "sub-index unreadable; covering its directory only");
            }
        }
    }
    covered
}

/// Whether `path` is one of the claimed paths or lies beneath one
#[must_use]
pub fn is_claimed(path: &Path, covered: &[PathBuf]) -> bool {
    covered.iter().any(|c| path.starts_with(c))
}

fn collect_orphans(
    children: &[ChildNode],
    parent_entity: Option<&str>,
    master_dir: &Path,
    covered: &[PathBuf],
    seen: &mut HashSet<PathBuf>,
    out: &mut Vec<ChildRef>,
) {
    for child in children {
        match child {
            ChildNode::Inline(node) => {
                collect_orphans(&node.children, Some(&node.id), master_dir, covered, seen, out);
            }
            ChildNode::SubIndex(_) => {}
            ChildNode::Leaf(include) => {
                let path = normalize(&master_dir.join(&include.include));
                if !is_claimed(&path, covered) && seen.insert(path.clone()) {
                    out.push(ChildRef {
                        key: include.key().to_string(),
                        include: include.include.clone(),
                        path,
                        parent_entity: parent_entity.map(str::to_string),
                    });
                }
            }
        }
    }
}

/// Hash over the master's hash and each index's path and bytes
fn fingerprint(master: ContentHash, indexes: &[DiscoveredIndex]) -> IndexResult<ContentHash> {
    let mut parts: Vec<Vec<u8>> = vec![master.as_bytes().to_vec()];
    for index in indexes {
        parts.push(index.path.to_string_lossy().as_bytes().to_vec());
        let bytes = std::fs::read(&index.path).map_err(|e| IndexError::io(&index.path, e))?;
        parts.push(ContentHash::compute(&bytes).as_bytes().to_vec());
    }
    Ok(ContentHash::compute_parts(&parts))
}

/// Keeps a master's orphan list current as sub-indexes come and go
#[derive(Debug, Clone)]
pub struct OrphanTracker {
    root_dir: PathBuf,
    master_path: PathBuf,
    fingerprint: Option<ContentHash>,
    sub_indexes: Vec<DiscoveredIndex>,
    orphans: Vec<ChildRef>,
}

impl OrphanTracker {
    /// Tracker for one master index; nothing is computed until
    /// [`Self::refresh`]
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>, master_path: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            master_path: master_path.into(),
            fingerprint: None,
            sub_indexes: Vec::new(),
            orphans: Vec::new(),
        }
    }

    /// Rediscover sub-indexes and recompute orphans if anything changed
    ///
    /// The fingerprint covers the master's bytes and every discovered index's
    /// path and bytes. Returns whether a recomputation happened.
    ///
    /// # Errors
    /// Returns error if the workspace cannot be walked or the master index
    /// cannot be loaded
    pub fn refresh(&mut self, store: &IndexStore) -> IndexResult<bool> {
        let discovered = discover_sub_indexes(&self.root_dir, &self.master_path)?;
        let master = store.load(&self.master_path)?;

        let fingerprint = fingerprint(master.hash, &discovered)?;

        if self.fingerprint == Some(fingerprint) {
            return Ok(false);
        }

        self.orphans = compute_orphans(&master.document, &master.path, &discovered, store);
        tracing::debug!(
            master = %self.master_path.display(),
            sub_indexes = discovered.len(),
            orphans = self.orphans.len(),
            "orphans recomputed"
        );
        self.sub_indexes = discovered;
        self.fingerprint = Some(fingerprint);
        Ok(true)
    }

    /// Orphans as of the last refresh
    #[inline]
    #[must_use]
    pub fn orphans(&self) -> &[ChildRef] {
        &self.orphans
    }

    /// Sub-indexes as of the last refresh
    #[inline]
    #[must_use]
    pub fn sub_indexes(&self) -> &[DiscoveredIndex] {
        &self.sub_indexes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_model::filename::INDEX_YAML;

    fn discovered(path: PathBuf) -> DiscoveredIndex {
        let kind = filename::classify(&path).unwrap();
        DiscoveredIndex { path, kind }
    }

    #[test]
    fn fingerprint_reports_unreadable_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let master = ContentHash::compute(b"id: root\n");

        let missing = discovered(dir.path().join("gone").join(INDEX_YAML));
        let err = fingerprint(master, &[missing]).unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));

        let present = dir.path().join(INDEX_YAML);
        std::fs::write(&present, "id: book\n").unwrap();
        let first = fingerprint(master, &[discovered(present.clone())]).unwrap();
        std::fs::write(&present, "id: book-renamed\n").unwrap();
        assert_ne!(fingerprint(master, &[discovered(present)]).unwrap(), first);
    }
}
