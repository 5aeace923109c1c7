//! Workspace facade
//!
//! Ties configuration, the index store, resolution, orphan tracking,
//! mutations, and cascades together for one workspace root. Every mutating
//! call runs the cascade for the folders it touched before returning.

use crate::cascade::{CascadeEngine, CascadeReport};
use crate::error::MutationResult;
use crate::mutation::{BatchReport, MutationOp, MutationReceipt, StructureEditor};
use codex_index::{
    ChildRef, IndexError, IndexResult, IndexStore, OrphanTracker, Outcome, Resolution, SubIndexResolver,
    WorkspaceConfig,
};
use codex_model::filename::INDEX_YAML;
use codex_model::path::absolutize;
use std::path::{Path, PathBuf};

/// A mutation and the cascade that followed it
#[derive(Debug, Clone)]
pub struct Applied {
    pub receipt: MutationReceipt,
    pub cascade: CascadeReport,
}

impl Applied {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.cascade.outcome()
    }
}

/// A batch and the single cascade that followed it
#[derive(Debug)]
pub struct BatchApplied {
    pub batch: BatchReport,
    /// `None` when no item succeeded
    pub cascade: Option<CascadeReport>,
}

impl BatchApplied {
    /// Failed items and cascade problems each count as one diagnostic
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self.batch.outcome() {
            Outcome::Rejected(reason) => Outcome::Rejected(reason),
            Outcome::Succeeded | Outcome::SucceededWithDiagnostics(_) => {
                let failed = self.batch.failed().count();
                let cascade = match self.cascade.as_ref().map(CascadeReport::outcome) {
                    Some(Outcome::SucceededWithDiagnostics(n)) => n,
                    Some(Outcome::Rejected(_)) => 1,
                    Some(Outcome::Succeeded) | None => 0,
                };
                Outcome::from_count(failed + cascade)
            }
        }
    }
}

/// One Codex workspace on disk
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
    store: IndexStore,
    tracker: Option<(PathBuf, OrphanTracker)>,
}

impl Workspace {
    /// Open a workspace root, reading `codex.toml` when present
    ///
    /// # Errors
    /// Returns error if the root is not a folder or the configuration is
    /// invalid
    pub fn open(root: impl AsRef<Path>) -> IndexResult<Self> {
        let root = root.as_ref();
        let root = absolutize(root).map_err(|e| IndexError::io(root, e))?;
        if !root.is_dir() {
            return Err(IndexError::NotFound(root));
        }
        let config = WorkspaceConfig::load(&root)?;
        tracing::debug!(root = %root.display(), format = %config.default_format, "workspace opened");
        Ok(Self::with_store(root, config, IndexStore::new()))
    }

    /// Workspace over an already absolute root with explicit parts
    #[must_use]
    pub fn with_store(root: PathBuf, config: WorkspaceConfig, store: IndexStore) -> Self {
        Self {
            root,
            config,
            store,
            tracker: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Root index file of the workspace
    ///
    /// # Errors
    /// Returns [`IndexError::NotFound`] if the root folder has no index
    pub fn master_path(&self) -> IndexResult<PathBuf> {
        self.store
            .find_index_in(&self.root)
            .ok_or_else(|| IndexError::NotFound(self.root.join(INDEX_YAML)))
    }

    /// Merged tree of the root index
    ///
    /// # Errors
    /// Returns error if the root index is missing or unreadable
    pub fn resolve(&self) -> IndexResult<Resolution> {
        SubIndexResolver::new(&self.store).resolve_file(&self.master_path()?)
    }

    /// Master content includes no sub-index claims
    ///
    /// Recomputed whenever the set of index files changed since the last
    /// call.
    ///
    /// # Errors
    /// Returns error if the workspace cannot be walked or the root index
    /// cannot be loaded
    pub fn orphans(&mut self) -> IndexResult<&[ChildRef]> {
        let master = self.master_path()?;
        let stale = self.tracker.as_ref().map_or(true, |(path, _)| *path != master);
        if stale {
            self.tracker = Some((master.clone(), OrphanTracker::new(self.root.clone(), master)));
        }
        match self.tracker.as_mut() {
            Some((_, tracker)) => {
                tracker.refresh(&self.store)?;
                Ok(tracker.orphans())
            }
            None => Ok(&[]),
        }
    }

    /// Cascade from one changed folder
    #[must_use]
    pub fn cascade(&self, folder: &Path) -> CascadeReport {
        self.engine().run(folder)
    }

    /// Apply one mutation, then cascade from the folders it touched
    ///
    /// # Errors
    /// Returns the mutation's error; nothing is cascaded when it fails
    pub fn apply(&self, op: &MutationOp) -> MutationResult<Applied> {
        let receipt = StructureEditor::new(&self.store).apply(op)?;
        let cascade = self.engine().run_all(&receipt.folders());
        Ok(Applied { receipt, cascade })
    }

    /// Apply each mutation independently, then cascade once over every
    /// folder a successful item touched
    #[must_use]
    pub fn apply_batch(&self, ops: &[MutationOp]) -> BatchApplied {
        let batch = StructureEditor::new(&self.store).apply_batch(ops);
        let folders = batch.folders();
        let cascade = (!folders.is_empty()).then(|| self.engine().run_all(&folders));
        BatchApplied { batch, cascade }
    }

    fn engine(&self) -> CascadeEngine<'_> {
        CascadeEngine::new(&self.store, &self.config, &self.root)
    }
}
