//! Index file storage
//!
//! [`IndexStore`] is the only component that touches index files on disk. It
//! reads and parses through a [`ParserRegistry`], and writes atomically: the
//! new bytes go to a temporary file in the destination directory which is
//! then renamed over the target, so an interrupted write never leaves a
//! half-written index behind.

use crate::error::{IndexError, IndexResult};
use crate::parsers::{default_parsers, ParserRegistry};
use codex_model::filename::{self, INDEX_FILE_NAMES};
use codex_model::{ContentHash, IndexDocument, IndexFileKind};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Index file of a folder, by precedence: visible YAML, visible JSON,
/// hidden YAML, hidden JSON
#[must_use]
pub fn index_file_in(dir: &Path) -> Option<PathBuf> {
    INDEX_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// One index file as read from disk
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Format and hidden/authored flag, from the file name
    pub kind: IndexFileKind,
    pub document: IndexDocument,
    /// Hash of the bytes as read
    pub hash: ContentHash,
}

impl LoadedIndex {
    /// Directory the file lives in (base for its includes)
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }
}

/// Result of a write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New bytes were written
    Written(ContentHash),
    /// File already held identical bytes; nothing written
    Unchanged(ContentHash),
}

impl WriteOutcome {
    /// Whether the file changed on disk
    #[inline]
    #[must_use]
    pub fn is_written(self) -> bool {
        matches!(self, Self::Written(_))
    }

    /// Hash of the file's bytes after the request
    #[inline]
    #[must_use]
    pub fn hash(self) -> ContentHash {
        match self {
            Self::Written(h) | Self::Unchanged(h) => h,
        }
    }
}

/// Counters of store activity
#[derive(Debug, Default)]
struct StoreCounters {
    loads: AtomicUsize,
    writes: AtomicUsize,
    unchanged: AtomicUsize,
}

/// Snapshot of store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Index files read and parsed
    pub loads: usize,
    /// Index files written
    pub writes: usize,
    /// Writes skipped because the bytes were identical
    pub unchanged: usize,
}

/// Reads, parses, and atomically writes index files
#[derive(Debug, Default)]
pub struct IndexStore {
    parsers: ParserRegistry,
    counters: StoreCounters,
    read_log: Option<Mutex<Vec<PathBuf>>>,
}

impl IndexStore {
    /// Store with the built-in parsers
    #[must_use]
    pub fn new() -> Self {
        Self::with_parsers(default_parsers())
    }

    /// Store with a custom parser registry
    #[must_use]
    pub fn with_parsers(parsers: ParserRegistry) -> Self {
        Self {
            parsers,
            counters: StoreCounters::default(),
            read_log: None,
        }
    }

    /// Also record the path of every loaded index (see [`Self::take_read_log`])
    #[must_use]
    pub fn with_read_log(mut self) -> Self {
        self.read_log = Some(Mutex::new(Vec::new()));
        self
    }

    /// Parser registry in use
    #[inline]
    #[must_use]
    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            loads: self.counters.loads.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            unchanged: self.counters.unchanged.load(Ordering::Relaxed),
        }
    }

    /// Drain the recorded load paths (empty unless [`Self::with_read_log`])
    #[must_use]
    pub fn take_read_log(&self) -> Vec<PathBuf> {
        self.read_log
            .as_ref()
            .and_then(|log| log.lock().ok().map(|mut l| std::mem::take(&mut *l)))
            .unwrap_or_default()
    }

    /// Read and parse one index file
    ///
    /// # Errors
    /// [`IndexError::NotAnIndex`] if the file name is not an index name,
    /// [`IndexError::NotFound`] if it does not exist, [`IndexError::Parse`]
    /// if it is malformed
    pub fn load(&self, path: &Path) -> IndexResult<LoadedIndex> {
        let kind = filename::classify(path).ok_or_else(|| IndexError::NotAnIndex(path.to_path_buf()))?;
        let bytes = std::fs::read(path).map_err(|e| IndexError::io(path, e))?;

        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        if let Some(log) = &self.read_log {
            if let Ok(mut log) = log.lock() {
                log.push(path.to_path_buf());
            }
        }
        tracing::debug!(file = %path.display(), bytes = bytes.len(), "loading index");

        let document = self.parsers.parse_path(&bytes, path)?;
        Ok(LoadedIndex {
            path: path.to_path_buf(),
            kind,
            document,
            hash: ContentHash::compute(&bytes),
        })
    }

    /// Index file of a folder; see [`index_file_in`]
    #[inline]
    #[must_use]
    pub fn find_index_in(&self, dir: &Path) -> Option<PathBuf> {
        index_file_in(dir)
    }

    /// Serialize a document in the format its path selects
    ///
    /// # Errors
    /// Returns error if the path is not an index name or serialization fails
    pub fn render(&self, path: &Path, doc: &IndexDocument) -> IndexResult<Vec<u8>> {
        let kind = filename::classify(path).ok_or_else(|| IndexError::NotAnIndex(path.to_path_buf()))?;
        let parser = self
            .parsers
            .for_format(kind.format)
            .ok_or_else(|| IndexError::NotAnIndex(path.to_path_buf()))?;
        Ok(parser.serialize(doc)?)
    }

    /// Write a document unless the file already holds identical bytes
    ///
    /// # Errors
    /// Returns error on serialization or IO failure
    pub fn save(&self, path: &Path, doc: &IndexDocument) -> IndexResult<WriteOutcome> {
        let bytes = self.render(path, doc)?;
        let hash = ContentHash::compute(&bytes);

        let current = match std::fs::read(path) {
            Ok(existing) => Some(ContentHash::compute(&existing)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(IndexError::io(path, e)),
        };
        if current == Some(hash) {
            self.counters.unchanged.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(file = %path.display(), "index unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged(hash));
        }

        write_atomic(path, &bytes)?;
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(file = %path.display(), hash = %hash.short(), "index written");
        Ok(WriteOutcome::Written(hash))
    }
}

/// Replace a file's contents via a sibling temporary file and rename
///
/// # Errors
/// Returns error if the temporary file cannot be created, written, or
/// renamed over the target
pub fn write_atomic(path: &Path, bytes: &[u8]) -> IndexResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| IndexError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| IndexError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| IndexError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| IndexError::io(path, e.error))?;
    Ok(())
}
