//! Folder index regeneration
//!
//! Brings one folder's index file up to date with the folder, touching no
//! other index file:
//!
//! 1. Load the folder's index, or start a generated one (configured format,
//!    dot-prefixed name, default patterns) when the folder has none.
//! 2. Generated indexes drop includes whose targets are gone. Authored
//!    indexes keep them, so a broken link stays visible to its author.
//! 3. If the document declares `patterns`, discover matching content files
//!    (descending into sub-folders that have no index of their own) and
//!    sub-folders that do have an index, and append whatever is not listed
//!    yet, sorted by path.
//! 4. Drop content includes that lie inside the folder of a listed
//!    sub-index; that sub-index owns them now.
//! 5. Save; identical bytes are not rewritten.
//!
//! Running it twice on an unchanged folder writes nothing the second time.

use crate::error::CascadeError;
use codex_index::{index_file_in, is_claimed, IndexError, IndexStore, WorkspaceConfig, WriteOutcome};
use codex_model::filename;
use codex_model::path::{absolutize, include_string, is_within, normalize};
use codex_model::{ChildNode, IndexDocument, PatternMatcher};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What one regeneration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRegen {
    pub dir: PathBuf,
    /// Index file written (or left unchanged)
    pub index_path: PathBuf,
    /// The folder had no index and one was generated
    pub created: bool,
    /// Dangling includes dropped
    pub pruned: usize,
    /// Includes added by pattern discovery
    pub added: usize,
    /// Content includes handed over to a sub-index in a sub-folder
    pub claimed: usize,
    pub write: WriteOutcome,
}

impl FolderRegen {
    /// Whether the index file changed on disk
    #[inline]
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.write.is_written()
    }
}

/// Regenerates single folder indexes
#[derive(Debug, Clone, Copy)]
pub struct FolderRegenerator<'a> {
    store: &'a IndexStore,
    config: &'a WorkspaceConfig,
}

impl<'a> FolderRegenerator<'a> {
    #[inline]
    #[must_use]
    pub fn new(store: &'a IndexStore, config: &'a WorkspaceConfig) -> Self {
        Self { store, config }
    }

    /// Regenerate `dir`'s own index
    ///
    /// # Errors
    /// Returns error if `dir` is not a folder, its index cannot be loaded or
    /// written, or its patterns are invalid
    pub fn regenerate(&self, dir: &Path) -> Result<FolderRegen, CascadeError> {
        let dir = absolutize(dir).map_err(|e| IndexError::io(dir, e))?;
        if !dir.is_dir() {
            return Err(CascadeError::NotAFolder(dir));
        }

        let (index_path, mut doc, hidden, created) = match self.store.find_index_in(&dir) {
            Some(path) => {
                let loaded = self.store.load(&path)?;
                (loaded.path, loaded.document, loaded.kind.hidden, false)
            }
            None => {
                let path = dir.join(self.config.generated_index_name());
                let mut doc = IndexDocument::empty_for(&path);
                doc.patterns = Some(self.config.default_patterns.clone());
                tracing::debug!(folder = %dir.display(), file = %path.display(), "generating missing index");
                (path, doc, self.config.hidden_generated, true)
            }
        };

        let pruned = if hidden { prune_dangling(&mut doc.children, &dir) } else { 0 };
        let added = match doc.patterns.clone() {
            Some(patterns) => {
                let matcher = patterns.compile()?;
                let found = discover(&dir, &matcher)?;
                append_unlisted(&mut doc, &dir, found)
            }
            None => 0,
        };
        let claimed = drop_claimed(&mut doc, &dir);

        let write = self.store.save(&index_path, &doc)?;
        tracing::debug!(
            folder = %dir.display(),
            created,
            pruned,
            added,
            claimed,
            written = write.is_written(),
            "folder regenerated"
        );
        Ok(FolderRegen {
            dir,
            index_path,
            created,
            pruned,
            added,
            claimed,
            write,
        })
    }
}

fn prune_dangling(children: &mut Vec<ChildNode>, dir: &Path) -> usize {
    let before = children.len();
    children.retain(|child| match child.include_ref() {
        Some(include) => normalize(&dir.join(&include.include)).exists(),
        None => true,
    });
    let mut pruned = before - children.len();
    for child in children.iter_mut() {
        if let Some(nested) = child.children_mut() {
            pruned += prune_dangling(nested, dir);
        }
    }
    pruned
}

/// Content files matching the patterns and index files of sub-folders,
/// sorted by path
fn discover(dir: &Path, matcher: &PatternMatcher) -> Result<Vec<PathBuf>, CascadeError> {
    let root = dir.to_path_buf();
    let filter_matcher = matcher.clone();
    let filter_root = root.clone();

    let walker = WalkBuilder::new(&root)
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                return true;
            }
            // folders with their own index are listed as sub-indexes, not walked
            let relative = entry.path().strip_prefix(&filter_root).unwrap_or(entry.path());
            index_file_in(entry.path()).is_none() && !filter_matcher.excludes_dir(relative)
        })
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(IndexError::from)?;
        let path = normalize(entry.path());
        let relative = path.strip_prefix(&root).unwrap_or(&path).to_path_buf();

        if entry.file_type().is_some_and(|t| t.is_dir()) {
            let listing = std::fs::read_dir(&path).map_err(|e| IndexError::io(&path, e))?;
            for sub in listing {
                let sub = sub.map_err(|e| IndexError::io(&path, e))?;
                let sub_path = sub.path();
                let hidden = sub.file_name().to_string_lossy().starts_with('.');
                if hidden || !sub_path.is_dir() || matcher.excludes_dir(&relative.join(sub.file_name())) {
                    continue;
                }
                if let Some(index) = index_file_in(&sub_path) {
                    found.push(normalize(&index));
                }
            }
        } else if !filename::is_index_file(&path) && matcher.matches(&relative) {
            found.push(path);
        }
    }

    found.sort();
    Ok(found)
}

/// Append discovered targets not already included; returns how many
fn append_unlisted(doc: &mut IndexDocument, dir: &Path, found: Vec<PathBuf>) -> usize {
    let mut listed: HashSet<PathBuf> = HashSet::new();
    let mut listed_dirs: HashSet<PathBuf> = HashSet::new();
    for include in doc.includes() {
        let target = normalize(&dir.join(&include.include));
        if include.targets_index() {
            if let Some(parent) = target.parent() {
                listed_dirs.insert(parent.to_path_buf());
            }
        }
        listed.insert(target);
    }

    let mut added = 0;
    for target in found {
        let already = if filename::is_index_file(&target) {
            target.parent().is_some_and(|p| listed_dirs.contains(p))
        } else {
            listed.contains(&target)
        };
        if already {
            continue;
        }
        let Ok(relative) = target.strip_prefix(dir) else {
            continue;
        };
        doc.children.push(ChildNode::include(include_string(relative)));
        added += 1;
    }
    added
}

/// Drop content includes inside the folder of any sub-index the document
/// lists below `dir`; returns how many
fn drop_claimed(doc: &mut IndexDocument, dir: &Path) -> usize {
    let claimed: Vec<PathBuf> = doc
        .includes()
        .into_iter()
        .filter(|include| include.targets_index())
        .filter_map(|include| normalize(&dir.join(&include.include)).parent().map(Path::to_path_buf))
        .filter(|folder| folder.as_path() != dir && is_within(folder, dir))
        .collect();
    if claimed.is_empty() {
        return 0;
    }
    release_claimed(&mut doc.children, dir, &claimed)
}

fn release_claimed(children: &mut Vec<ChildNode>, dir: &Path, claimed: &[PathBuf]) -> usize {
    let before = children.len();
    children.retain(|child| match child {
        ChildNode::Leaf(include) => !is_claimed(&normalize(&dir.join(&include.include)), claimed),
        ChildNode::Inline(_) | ChildNode::SubIndex(_) => true,
    });
    let mut released = before - children.len();
    for child in children.iter_mut() {
        if let Some(nested) = child.children_mut() {
            released += release_claimed(nested, dir, claimed);
        }
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_model::{InlineNode, Patterns};
    use pretty_assertions::assert_eq;

    #[test]
    fn pruning_reaches_into_inline_nodes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kept.md"), "").unwrap();

        let mut children = vec![
            ChildNode::include("./kept.md"),
            ChildNode::include("./gone.md"),
            ChildNode::Inline(
                InlineNode::new("grp", "folder", "Group")
                    .with_child(ChildNode::include("./gone/index.codex.yaml"))
                    .with_child(ChildNode::include("./kept.md")),
            ),
        ];
        assert_eq!(prune_dangling(&mut children, dir.path()), 2);
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].children().len(), 1);
    }

    #[test]
    fn listed_sub_index_folders_are_not_added_twice() {
        let mut doc = IndexDocument::new("root", "index", "Root")
            .with_child(ChildNode::include("./book/index.codex.yaml"))
            .with_child(ChildNode::include("./a.md"));
        let dir = Path::new("/ws");
        let found = vec![
            PathBuf::from("/ws/a.md"),
            PathBuf::from("/ws/b.md"),
            PathBuf::from("/ws/book/.index.codex.yaml"),
            PathBuf::from("/ws/part/index.codex.json"),
        ];

        assert_eq!(append_unlisted(&mut doc, dir, found), 2);
        let includes: Vec<&str> = doc.includes().iter().map(|i| i.include.as_str()).collect();
        assert_eq!(
            includes,
            ["./book/index.codex.yaml", "./a.md", "./b.md", "./part/index.codex.json"]
        );
    }

    #[test]
    fn sub_index_folders_take_over_listed_files() {
        let mut doc = IndexDocument::new("root", "index", "Root")
            .with_child(ChildNode::include("./book/ch.md"))
            .with_child(ChildNode::include("./intro.md"))
            .with_child(ChildNode::Inline(
                InlineNode::new("grp", "folder", "Group").with_child(ChildNode::include("./book/part/p.md")),
            ))
            .with_child(ChildNode::include("./book/.index.codex.yaml"))
            .with_child(ChildNode::include("../elsewhere/index.codex.yaml"));

        assert_eq!(drop_claimed(&mut doc, Path::new("/ws")), 2);
        let includes: Vec<&str> = doc.includes().iter().map(|i| i.include.as_str()).collect();
        assert_eq!(
            includes,
            ["./intro.md", "./book/.index.codex.yaml", "../elsewhere/index.codex.yaml"]
        );
    }

    #[test]
    fn discovery_walks_index_less_folders_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = normalize(&dir.path().canonicalize().unwrap());
        for file in ["ch1.md", "notes/idea.md", "part/p1.md", "_drafts/old.md", ".hidden.md", "cover.png"] {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        std::fs::write(root.join("part/index.codex.yaml"), "id: part\n").unwrap();

        let matcher = Patterns::new(["**/*.md"], ["_drafts/**"]).compile().unwrap();
        let found = discover(&root, &matcher).unwrap();
        assert_eq!(
            found,
            [
                root.join("ch1.md"),
                root.join("notes/idea.md"),
                root.join("part/index.codex.yaml"),
            ]
        );
    }
}
