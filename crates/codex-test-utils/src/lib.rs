//! Testing utilities for Codex workspace
//!
//! Temporary on-disk workspaces and small builders for index file text.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use codex_model::path::normalize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A workspace directory that is deleted on drop
pub struct TempWorkspace {
    _dir: TempDir,
    root: PathBuf,
}

impl TempWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp workspace");
        let root = normalize(&dir.path().canonicalize().expect("canonical temp path"));
        Self { _dir: dir, root }
    }

    /// Absolute workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a workspace-relative path
    pub fn path(&self, rel: &str) -> PathBuf {
        normalize(&self.root.join(rel))
    }

    /// Write a file, creating parent folders
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Create an empty content file
    pub fn touch(&self, rel: &str) -> PathBuf {
        self.write(rel, "")
    }

    /// Create a folder
    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(&path).expect("create dir");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("read fixture file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for YAML index text
#[derive(Debug, Clone, Default)]
pub struct IndexYaml {
    header: Vec<(String, String)>,
    children: Vec<String>,
}

impl IndexYaml {
    pub fn new(id: &str) -> Self {
        Self::default().field("id", id)
    }

    /// Index without an `id` (derived from its folder)
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.header.push((key.to_string(), value.to_string()));
        self
    }

    pub fn name(self, name: &str) -> Self {
        self.field("name", name)
    }

    pub fn node_type(self, node_type: &str) -> Self {
        self.field("type", node_type)
    }

    /// Plain `include:` entry
    pub fn include(mut self, path: &str) -> Self {
        self.children.push(format!("  - include: {path}\n"));
        self
    }

    /// `include:` entry with extra keys
    pub fn include_with(mut self, path: &str, fields: &[(&str, &str)]) -> Self {
        let mut entry = format!("  - include: {path}\n");
        for (k, v) in fields {
            let _ = writeln!(entry, "    {k}: {v}");
        }
        self.children.push(entry);
        self
    }

    /// Inline leaf node
    pub fn inline(mut self, id: &str, name: &str) -> Self {
        self.children.push(format!("  - id: {id}\n    name: {name}\n"));
        self
    }

    /// Inline node with an order key
    pub fn inline_ordered(mut self, id: &str, name: &str, order: i64) -> Self {
        self.children
            .push(format!("  - id: {id}\n    name: {name}\n    order: {order}\n"));
        self
    }

    /// Inline container holding the given includes
    pub fn inline_with_includes(mut self, id: &str, name: &str, includes: &[&str]) -> Self {
        let mut entry = format!("  - id: {id}\n    name: {name}\n    children:\n");
        for include in includes {
            let _ = writeln!(entry, "      - include: {include}");
        }
        self.children.push(entry);
        self
    }

    /// `patterns:` block
    pub fn patterns(self, include: &[&str], exclude: &[&str]) -> Self {
        let list = |globs: &[&str]| {
            globs
                .iter()
                .map(|g| format!("\"{g}\""))
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.field(
            "patterns",
            &format!("\n  include: [{}]\n  exclude: [{}]", list(include), list(exclude)),
        )
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.header {
            let _ = writeln!(out, "{k}: {v}");
        }
        if self.children.is_empty() {
            out.push_str("children: []\n");
        } else {
            out.push_str("children:\n");
            for child in &self.children {
                out.push_str(child);
            }
        }
        out
    }

    /// Write to `rel` inside a workspace
    pub fn write_to(&self, ws: &TempWorkspace, rel: &str) -> PathBuf {
        ws.write(rel, &self.build())
    }
}
