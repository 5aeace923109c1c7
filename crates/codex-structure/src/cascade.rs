//! Cascade regeneration
//!
//! After a structural change, bring the index files above it up to date
//! without rescanning the workspace:
//!
//! ```text
//! Changed ──► Propagate-Up ──► Top-Merge
//!   │             │                │
//!   │             │                └─ resolve the root index once
//!   │             └─ each ancestor's own index, stopping at the workspace
//!   │                root or the first ancestor without an index
//!   └─ the changed folder's index (generated if missing)
//! ```
//!
//! Work is bounded by the depth of the changed folders, not the size of the
//! tree. A folder that fails is logged and recorded; the others still run.

use crate::error::{CascadeError, CascadeFailure};
use crate::generator::{FolderRegen, FolderRegenerator};
use codex_index::{IndexStore, Outcome, Resolution, SubIndexResolver, WorkspaceConfig};
use codex_model::path::{absolutize, is_within, normalize};
use std::path::{Path, PathBuf};

/// Result of one cascade
#[derive(Debug, Clone, Default)]
pub struct CascadeReport {
    /// Changed folders the cascade started from
    pub changed: Vec<PathBuf>,
    /// Folders regenerated, deepest first
    pub regenerated: Vec<FolderRegen>,
    pub failures: Vec<CascadeFailure>,
    /// Merged tree of the root index, when a top merge ran
    pub merged: Option<Resolution>,
}

impl CascadeReport {
    /// Number of index files that changed on disk
    #[must_use]
    pub fn written(&self) -> usize {
        self.regenerated.iter().filter(|r| r.is_written()).count()
    }

    /// Whether `dir` was regenerated
    #[must_use]
    pub fn regenerated_folder(&self, dir: &Path) -> bool {
        self.regenerated.iter().any(|r| r.dir == dir)
    }

    /// `Rejected` if nothing could be regenerated; otherwise one diagnostic
    /// per failed folder plus the merged tree's diagnostics
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.regenerated.is_empty() {
            if let Some(first) = self.failures.first() {
                return Outcome::Rejected(first.to_string());
            }
        }
        let merge_diagnostics = self.merged.as_ref().map_or(0, |m| m.diagnostics.len());
        Outcome::from_count(self.failures.len() + merge_diagnostics)
    }
}

/// Drives cascades inside one workspace root
#[derive(Debug, Clone)]
pub struct CascadeEngine<'a> {
    store: &'a IndexStore,
    config: &'a WorkspaceConfig,
    root: PathBuf,
}

impl<'a> CascadeEngine<'a> {
    #[must_use]
    pub fn new(store: &'a IndexStore, config: &'a WorkspaceConfig, root: &Path) -> Self {
        Self {
            store,
            config,
            root: absolutize(root).unwrap_or_else(|_| normalize(root)),
        }
    }

    /// Workspace root the cascade stops at
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cascade from one changed folder
    #[must_use]
    pub fn run(&self, changed: &Path) -> CascadeReport {
        self.run_all(&[changed.to_path_buf()])
    }

    /// Cascade from several changed folders with one shared top merge
    ///
    /// Ancestor chains that overlap are regenerated once. Folders run
    /// deepest first so every level sees its children's new state.
    #[must_use]
    pub fn run_all(&self, changed: &[PathBuf]) -> CascadeReport {
        let mut report = CascadeReport::default();
        let mut plan: Vec<PathBuf> = Vec::new();

        for folder in changed {
            let folder = absolutize(folder).unwrap_or_else(|_| normalize(folder));
            if !is_within(&folder, &self.root) {
                let err = CascadeError::OutsideWorkspace {
                    folder: folder.clone(),
                    root: self.root.clone(),
                };
                tracing::warn!(folder = %folder.display(), error = %err, "cascade skipped folder");
                report.failures.push(CascadeFailure::new(folder, err));
                continue;
            }
            push_unique(&mut plan, folder.clone());
            for ancestor in self.ancestors_with_index(&folder) {
                push_unique(&mut plan, ancestor);
            }
            report.changed.push(folder);
        }

        plan.sort_by(|a, b| {
            b.components()
                .count()
                .cmp(&a.components().count())
                .then_with(|| a.cmp(b))
        });

        let regenerator = FolderRegenerator::new(self.store, self.config);
        for folder in plan {
            match regenerator.regenerate(&folder) {
                Ok(regen) => report.regenerated.push(regen),
                Err(e) => {
                    tracing::warn!(folder = %folder.display(), error = %e, "folder regeneration failed; continuing");
                    report.failures.push(CascadeFailure::new(folder, e));
                }
            }
        }

        if self.config.merge_on_cascade && !report.regenerated.is_empty() {
            self.top_merge(&mut report);
        }

        tracing::info!(
            changed = report.changed.len(),
            regenerated = report.regenerated.len(),
            written = report.written(),
            failures = report.failures.len(),
            merged = report.merged.is_some(),
            "cascade finished"
        );
        report
    }

    /// Parent, grandparent, ... up to the root, while each has an index
    fn ancestors_with_index(&self, folder: &Path) -> Vec<PathBuf> {
        let mut chain = Vec::new();
        if folder == self.root {
            return chain;
        }
        for dir in folder.ancestors().skip(1) {
            if !is_within(dir, &self.root) {
                break;
            }
            if self.store.find_index_in(dir).is_none() {
                tracing::debug!(folder = %dir.display(), "no index; propagation stops");
                break;
            }
            chain.push(dir.to_path_buf());
            if dir == self.root {
                break;
            }
        }
        chain
    }

    fn top_merge(&self, report: &mut CascadeReport) {
        let Some(root_index) = self.store.find_index_in(&self.root) else {
            tracing::debug!(root = %self.root.display(), "workspace has no root index; skipping merge");
            return;
        };
        match SubIndexResolver::new(self.store).resolve_file(&root_index) {
            Ok(resolution) => report.merged = Some(resolution),
            Err(e) => {
                tracing::warn!(file = %root_index.display(), error = %e, "top merge failed");
                report.failures.push(CascadeFailure::new(self.root.clone(), e));
            }
        }
    }
}

fn push_unique(plan: &mut Vec<PathBuf>, folder: PathBuf) {
    if !plan.contains(&folder) {
        plan.push(folder);
    }
}
