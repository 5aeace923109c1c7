//! Cancellable resolution
//!
//! [`ResolveJob`] expands one top-level child of the root index per
//! [`ResolveJob::step`], so a caller driving it from an event loop can stay
//! responsive and stop early through a [`CancelToken`].

use crate::diagnostics::Diagnostic;
use crate::error::{IndexError, IndexResult};
use crate::resolver::{Resolution, Scope, SubIndexResolver};
use crate::store::{IndexStore, LoadedIndex};
use codex_model::ordering::sort_siblings;
use codex_model::path::absolutize;
use codex_model::ResolvedNode;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag that asks a running job to stop
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress of a [`ResolveJob`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// More top-level children remain
    Pending { done: usize, total: usize },
    /// Every top-level child has been expanded
    Finished,
    /// Stopped by its token
    Cancelled,
}

/// One resolution pass, driven step by step
#[derive(Debug)]
pub struct ResolveJob<'s> {
    resolver: SubIndexResolver<'s>,
    root: LoadedIndex,
    visited: HashSet<PathBuf>,
    diagnostics: Vec<Diagnostic>,
    resolved: Vec<ResolvedNode>,
    next: usize,
    token: CancelToken,
    cancelled: bool,
}

impl<'s> ResolveJob<'s> {
    /// Load the root index and prepare a pass
    ///
    /// # Errors
    /// Returns error if the root index cannot be loaded
    pub fn start(store: &'s IndexStore, path: &Path, token: CancelToken) -> IndexResult<Self> {
        let path = absolutize(path).map_err(|e| IndexError::io(path, e))?;
        let root = store.load(&path)?;
        tracing::debug!(root = %path.display(), children = root.document.children.len(), "resolution started");

        Ok(Self {
            resolver: SubIndexResolver::new(store),
            root,
            visited: HashSet::from([path]),
            diagnostics: Vec::new(),
            resolved: Vec::new(),
            next: 0,
            token,
            cancelled: false,
        })
    }

    /// Number of top-level children to expand
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.root.document.children.len()
    }

    /// Top-level nodes expanded so far, in authoring order
    #[must_use]
    pub fn resolved_so_far(&self) -> &[ResolvedNode] {
        &self.resolved
    }

    /// Expand the next top-level child
    pub fn step(&mut self) -> JobState {
        if self.cancelled || self.token.is_cancelled() {
            if !self.cancelled {
                tracing::debug!(root = %self.root.path.display(), done = self.next, "resolution cancelled");
            }
            self.cancelled = true;
            return JobState::Cancelled;
        }

        let total = self.total();
        if self.next < total {
            let scope = Scope::root(&self.root.path, self.root.dir());
            let child = &self.root.document.children[self.next];
            if let Some(node) = self
                .resolver
                .resolve_child(child, scope, &mut self.visited, &mut self.diagnostics)
            {
                self.resolved.push(node);
            }
            self.next += 1;
        }

        if self.next >= total {
            JobState::Finished
        } else {
            JobState::Pending {
                done: self.next,
                total,
            }
        }
    }

    /// Step to completion and return the merged tree
    ///
    /// # Errors
    /// Returns [`IndexError::Cancelled`] if the token fires first
    pub fn run(mut self) -> IndexResult<Resolution> {
        loop {
            match self.step() {
                JobState::Pending { .. } => {}
                JobState::Finished => return Ok(self.finish()),
                JobState::Cancelled => return Err(IndexError::Cancelled),
            }
        }
    }

    /// Build the [`Resolution`] from what has been expanded
    ///
    /// Normally called once [`Self::step`] returned [`JobState::Finished`];
    /// on an unfinished job the tree holds only the children expanded so far.
    #[must_use]
    pub fn finish(self) -> Resolution {
        let Self {
            root,
            mut resolved,
            diagnostics,
            ..
        } = self;
        sort_siblings(&mut resolved);
        tracing::debug!(
            root = %root.path.display(),
            nodes = resolved.iter().map(ResolvedNode::subtree_len).sum::<usize>(),
            diagnostics = diagnostics.len(),
            "resolution finished"
        );

        Resolution {
            root_id: root.document.id,
            root_type: root.document.node_type,
            root_name: root.document.name,
            root_path: root.path,
            children: resolved,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.codex.yaml"),
            "children:\n  - include: ./a.md\n  - include: ./b.md\n  - include: ./c.md\n",
        )
        .unwrap();
        for name in ["a.md", "b.md", "c.md"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        dir
    }

    #[test]
    fn steps_one_child_at_a_time() {
        let dir = workspace();
        let store = IndexStore::new();
        let mut job = ResolveJob::start(&store, &dir.path().join("index.codex.yaml"), CancelToken::new()).unwrap();

        assert_eq!(job.step(), JobState::Pending { done: 1, total: 3 });
        assert_eq!(job.step(), JobState::Pending { done: 2, total: 3 });
        assert_eq!(job.step(), JobState::Finished);
        assert_eq!(job.step(), JobState::Finished);
        assert_eq!(job.finish().children.len(), 3);
    }

    #[test]
    fn cancellation_stops_the_job() {
        let dir = workspace();
        let store = IndexStore::new();
        let token = CancelToken::new();
        let mut job = ResolveJob::start(&store, &dir.path().join("index.codex.yaml"), token.clone()).unwrap();

        job.step();
        token.cancel();
        assert_eq!(job.step(), JobState::Cancelled);
        assert_eq!(job.resolved_so_far().len(), 1);
        assert!(matches!(job.run(), Err(IndexError::Cancelled)));
    }

    #[test]
    fn empty_root_finishes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.codex.json"), "{}").unwrap();
        let store = IndexStore::new();
        let mut job = ResolveJob::start(&store, &dir.path().join("index.codex.json"), CancelToken::new()).unwrap();
        assert_eq!(job.step(), JobState::Finished);
    }
}
