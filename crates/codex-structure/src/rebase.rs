//! Include path rebasing
//!
//! Include strings are relative to the directory of the index file holding
//! them. When an entry moves to an index in another directory, every include
//! in its subtree is rewritten so it still names the same absolute target.

use crate::error::ValidationError;
use codex_model::path::{include_string, normalize, relative_path};
use codex_model::ChildNode;
use std::path::Path;

/// Rewrite one include string from `from_dir` to `to_dir`
///
/// Absolute include strings are returned unchanged.
///
/// # Errors
/// Returns [`ValidationError::Rebase`] if no relative path connects the two
/// directories
pub fn rebase_include(include: &str, from_dir: &Path, to_dir: &Path) -> Result<String, ValidationError> {
    if Path::new(include).is_absolute() {
        return Ok(include.to_string());
    }
    let target = normalize(&from_dir.join(include));
    let relative = relative_path(&target, to_dir).map_err(|source| ValidationError::Rebase {
        include: include.to_string(),
        source,
    })?;
    Ok(include_string(&relative))
}

/// Rebase every include in `node`'s subtree, returning how many changed
///
/// Nothing is modified unless every include can be rebased.
///
/// # Errors
/// Returns [`ValidationError::Rebase`] for the first include that cannot be
/// expressed relative to `to_dir`
pub fn rebase_node(node: &mut ChildNode, from_dir: &Path, to_dir: &Path) -> Result<usize, ValidationError> {
    let from_dir = normalize(from_dir);
    let to_dir = normalize(to_dir);
    if from_dir == to_dir {
        return Ok(0);
    }

    let rewritten = node
        .includes()
        .into_iter()
        .map(|include| rebase_include(&include.include, &from_dir, &to_dir))
        .collect::<Result<Vec<_>, _>>()?;

    let mut changed = 0;
    for (include, new) in node.includes_mut().into_iter().zip(rewritten) {
        if include.include != new {
            tracing::debug!(from = %include.include, to = %new, "include rebased");
            include.include = new;
            changed += 1;
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_model::InlineNode;
    use pretty_assertions::assert_eq;

    #[test]
    fn sibling_folder_rebase() {
        let rebased = rebase_include("./ch1.md", Path::new("/ws/book-1"), Path::new("/ws/book-2")).unwrap();
        assert_eq!(rebased, "../book-1/ch1.md");
    }

    #[test]
    fn moving_up_shortens_paths() {
        let rebased =
            rebase_include("./scenes/s1.md", Path::new("/ws/book/act-1"), Path::new("/ws/book")).unwrap();
        assert_eq!(rebased, "./act-1/scenes/s1.md");
    }

    #[test]
    fn absolute_includes_are_kept() {
        let rebased = rebase_include("/abs/x.md", Path::new("/ws/a"), Path::new("/ws/b")).unwrap();
        assert_eq!(rebased, "/abs/x.md");
    }

    #[test]
    fn container_subtree_is_rebased() {
        let mut node = ChildNode::Inline(
            InlineNode::new("act-1", "act", "Act 1")
                .with_child(ChildNode::include("./s1.md"))
                .with_child(ChildNode::include("../shared/map.md"))
                .with_child(ChildNode::include("./part/index.codex.yaml")),
        );

        let changed = rebase_node(&mut node, Path::new("/ws/book"), Path::new("/ws/book/act-1")).unwrap();
        assert_eq!(changed, 3);

        let includes: Vec<&str> = node.includes().iter().map(|i| i.include.as_str()).collect();
        assert_eq!(includes, ["../s1.md", "../../shared/map.md", "../part/index.codex.yaml"]);
        assert!(matches!(node.children()[2], ChildNode::SubIndex(_)));
    }

    #[test]
    fn same_folder_is_a_no_op() {
        let mut node = ChildNode::include("./a.md");
        assert_eq!(rebase_node(&mut node, Path::new("/ws/x/"), Path::new("/ws/x")).unwrap(), 0);
    }
}
