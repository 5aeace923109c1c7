//! Paths through the index hierarchy
//!
//! Provides [`DirChain`], the chain of directory names from the workspace root
//! to a node, plus lexical helpers for include paths. Nothing here touches the
//! filesystem: include targets may be dangling and must still get a stable
//! absolute path.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Chain of on-disk names from the workspace root to a node
///
/// Built only from directory basenames and include paths, never from display
/// names, so renaming a node cannot change where it lives.
///
/// # Examples
/// - `["book-1", "chapter-01.md"]` → `book-1/chapter-01.md`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DirChain(Vec<String>);

impl DirChain {
    /// Create chain from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Empty chain (workspace root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Chain segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root chain
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent chain (if not root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append one segment, returning a new chain
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Append a slash-separated relative path such as `./notes/a.md`
    #[must_use]
    pub fn extend_relative(&self, relative: &str) -> Self {
        let mut new = self.clone();
        new.0.extend(
            relative
                .split(['/', '\\'])
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string),
        );
        new
    }

    /// Whether this chain is a prefix of another
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Strict prefix
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// On-disk location of this chain under a workspace root
    #[must_use]
    pub fn resolve_under(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in &self.0 {
            path.push(segment);
        }
        normalize(&path)
    }
}

impl Display for DirChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for DirChain {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start_matches("./");
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let segments = trimmed
            .split('/')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else if seg == "." || seg.contains('\\') {
                    Err(PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<String>> for DirChain {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// Errors related to chains and include paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in chain
    #[error("path contains empty segment")]
    EmptySegment,

    /// Segment that cannot name a directory entry
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// No relative path between the two locations
    #[error("'{}' cannot be expressed relative to '{}'", .target.display(), .base.display())]
    NoRelativePath { target: PathBuf, base: PathBuf },
}

/// Lexically normalise a path: drop `.` and fold `..` into its parent
///
/// Leading `..` of a relative path are kept; `..` above the root is dropped.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Make a path absolute against the current directory, then normalise it
///
/// # Errors
/// Returns error if the current directory cannot be determined
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Path of `target` relative to the directory `base`
///
/// # Errors
/// Returns error when the two paths share no root (mixed absolute/relative,
/// or different drive prefixes)
pub fn relative_path(target: &Path, base: &Path) -> Result<PathBuf, PathError> {
    let target = normalize(target);
    let base = normalize(base);
    let no_relative = || PathError::NoRelativePath {
        target: target.clone(),
        base: base.clone(),
    };

    if target.is_absolute() != base.is_absolute() {
        return Err(no_relative());
    }

    let t: Vec<Component<'_>> = target.components().filter(|c| *c != Component::CurDir).collect();
    let b: Vec<Component<'_>> = base.components().filter(|c| *c != Component::CurDir).collect();
    let common = t.iter().zip(&b).take_while(|(x, y)| x == y).count();
    if common == 0 && target.is_absolute() {
        return Err(no_relative());
    }

    let mut rel = PathBuf::new();
    for _ in common..b.len() {
        rel.push("..");
    }
    for component in &t[common..] {
        rel.push(component.as_os_str());
    }
    Ok(rel)
}

/// Render a relative path in include syntax: forward slashes, `./` prefix
/// unless the path climbs out with `..`
#[must_use]
pub fn include_string(relative: &Path) -> String {
    let joined = relative
        .components()
        .filter(|c| *c != Component::CurDir)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

/// Whether `path` equals `dir` or lies beneath it (lexically)
#[must_use]
pub fn is_within(path: &Path, dir: &Path) -> bool {
    normalize(path).starts_with(normalize(dir))
}

/// Last component of a path as an owned string
#[must_use]
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_child_and_parent() {
        let chain = DirChain::root().child("book-1").child("act-1");
        assert_eq!(chain.segments(), &["book-1", "act-1"]);
        assert_eq!(chain.parent().unwrap().segments(), &["book-1"]);
        assert_eq!(chain.last(), Some("act-1"));
        assert!(DirChain::root().parent().is_none());
    }

    #[test]
    fn chain_extend_relative_skips_dot_segments() {
        let chain = DirChain::root().child("book-1").extend_relative("./notes/a.md");
        assert_eq!(chain.to_string(), "book-1/notes/a.md");
    }

    #[test]
    fn chain_prefix_relations() {
        let a: DirChain = "book-1".parse().unwrap();
        let b: DirChain = "book-1/act-1".parse().unwrap();
        assert!(a.is_prefix_of(&b));
        assert!(a.is_ancestor_of(&b));
        assert!(!b.is_prefix_of(&a));
        assert!(!a.is_ancestor_of(&a));
    }

    #[test]
    fn chain_from_str_rejects_empty_segment() {
        let result: Result<DirChain, _> = "a//b".parse();
        assert!(matches!(result, Err(PathError::EmptySegment)));
        assert!("./".parse::<DirChain>().unwrap().is_empty());
    }

    #[test]
    fn chain_resolves_under_root() {
        let chain: DirChain = "book-1/../book-2/ch.md".parse().unwrap();
        assert_eq!(
            chain.resolve_under(Path::new("/ws")),
            PathBuf::from("/ws/book-2/ch.md")
        );
    }

    #[test]
    fn normalize_folds_parent_dirs() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("../x/../y")), PathBuf::from("../y"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn relative_path_between_siblings() {
        let rel = relative_path(Path::new("/ws/b/index.codex.yaml"), Path::new("/ws/a")).unwrap();
        assert_eq!(rel, PathBuf::from("../b/index.codex.yaml"));

        let rel = relative_path(Path::new("/ws/a/x.md"), Path::new("/ws/a")).unwrap();
        assert_eq!(rel, PathBuf::from("x.md"));
    }

    #[test]
    fn relative_path_requires_shared_root() {
        assert!(relative_path(Path::new("a/b"), Path::new("/ws")).is_err());
    }

    #[test]
    fn include_string_forms() {
        assert_eq!(include_string(Path::new("x.md")), "./x.md");
        assert_eq!(include_string(Path::new("sub/x.md")), "./sub/x.md");
        assert_eq!(include_string(Path::new("../b/index.codex.yaml")), "../b/index.codex.yaml");
    }

    #[test]
    fn within_checks_ancestry() {
        assert!(is_within(Path::new("/ws/book/ch.md"), Path::new("/ws/book")));
        assert!(is_within(Path::new("/ws/book"), Path::new("/ws/book")));
        assert!(!is_within(Path::new("/ws/book-2/ch.md"), Path::new("/ws/book")));
    }
}
