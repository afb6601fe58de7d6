//! # Path Addressing
//!
//! A [`TreePath`] names a node by the chain of zero-based child indices
//! leading to it from the root. The empty path is the root itself.
//!
//! Paths are positional, so a path captured before a structural edit may
//! point at a different node (or nowhere) afterwards. Code that has to
//! survive concurrent edits re-derives the path from the node id with
//! [`find_path`].

use crate::error::TemplateError;
use crate::model::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the `index`-th child of this node
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Split into the parent's path and this node's index in it.
    /// `None` for the root.
    pub fn parent_and_index(&self) -> Option<(TreePath, usize)> {
        let (last, parent) = self.0.split_last()?;
        Some((TreePath(parent.to_vec()), *last))
    }

    /// True if `self` is `other` or one of its ancestors
    pub fn is_ancestor_of(&self, other: &TreePath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for TreePath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Walk `children[index]` from the root along `path`
pub fn resolve_path<'a>(tree: &'a Node, path: &TreePath) -> Result<&'a Node, TemplateError> {
    let mut current = tree;
    for &index in path.indices() {
        current = current
            .children()
            .and_then(|children| children.get(index))
            .ok_or_else(|| TemplateError::PathNotFound(path.clone()))?;
    }
    Ok(current)
}

pub(crate) fn resolve_path_mut<'a>(
    tree: &'a mut Node,
    path: &TreePath,
) -> Result<&'a mut Node, TemplateError> {
    let mut current = tree;
    for &index in path.indices() {
        current = current
            .children_mut()
            .and_then(|children| children.get_mut(index))
            .ok_or_else(|| TemplateError::PathNotFound(path.clone()))?;
    }
    Ok(current)
}

/// Copy-on-write edit: returns a new tree in which `f` has been applied to
/// the node at `path`. The input tree is left untouched.
pub fn update_at<F, E>(tree: &Node, path: &TreePath, f: F) -> Result<Node, E>
where
    F: FnOnce(&mut Node) -> Result<(), E>,
    E: From<TemplateError>,
{
    let mut next = tree.clone();
    let target = resolve_path_mut(&mut next, path)?;
    f(target)?;
    Ok(next)
}

/// Current path of the node with `id`, if it is still in the tree
pub fn find_path(tree: &Node, id: &str) -> Option<TreePath> {
    walk(tree)
        .find(|(_, node)| node.id == id)
        .map(|(path, _)| path)
}

/// Depth-first, pre-order traversal yielding each node with its path
pub fn walk(tree: &Node) -> Walk<'_> {
    Walk {
        stack: vec![(TreePath::root(), tree)],
    }
}

pub struct Walk<'a> {
    stack: Vec<(TreePath, &'a Node)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (TreePath, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        if let Some(children) = node.children() {
            for (index, child) in children.iter().enumerate().rev() {
                self.stack.push((path.child(index), child));
            }
        }
        Some((path, node))
    }
}

/// Join a section's base directory onto its parent's resolved directory.
///
/// An absolute `child` replaces the parent; `.` components are dropped and
/// Windows separators are accepted.
pub fn compose_directory(parent: &str, child: &str) -> String {
    let child = child.replace('\\', "/");
    let joined: PathBuf = if parent.is_empty() {
        PathBuf::from(&child)
    } else {
        Path::new(&parent.replace('\\', "/")).join(&child)
    };

    let normalized: PathBuf = joined
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    normalized.to_string_lossy().into_owned()
}

/// Directory context used to resolve every node: the composed directory of
/// its nearest enclosing section. For a section this is its own directory.
pub fn effective_directories(tree: &Node) -> HashMap<NodeId, String> {
    let mut directories = HashMap::new();
    collect_directories(tree, "", &mut directories);
    directories
}

fn collect_directories(node: &Node, parent_dir: &str, out: &mut HashMap<NodeId, String>) {
    match node.section() {
        Some(section) => {
            let dir = compose_directory(parent_dir, &section.base_directory);
            for child in &section.children {
                collect_directories(child, &dir, out);
            }
            out.insert(node.id.clone(), dir);
        }
        None => {
            out.insert(node.id.clone(), parent_dir.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{create_default_node, NodeKind};

    fn sample_tree() -> Node {
        let mut root = Node::empty_root();
        root.section_mut().unwrap().base_directory = "/reports/job-1".to_string();

        let mut inner = create_default_node(NodeKind::Section);
        inner.section_mut().unwrap().base_directory = "B".to_string();
        inner.add_child(create_default_node(NodeKind::MatcherLeaf), None).unwrap();

        root.add_child(create_default_node(NodeKind::DocumentLeaf), None).unwrap();
        root.add_child(inner, None).unwrap();
        root
    }

    #[test]
    fn test_resolve_root_and_nested() {
        let tree = sample_tree();

        assert_eq!(resolve_path(&tree, &TreePath::root()).unwrap().id, tree.id);
        let leaf = resolve_path(&tree, &TreePath::new(vec![1, 0])).unwrap();
        assert_eq!(leaf.kind(), NodeKind::MatcherLeaf);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let tree = sample_tree();

        let err = resolve_path(&tree, &TreePath::new(vec![5])).unwrap_err();
        assert!(err.is_path_not_found());

        // Descending into a leaf
        let err = resolve_path(&tree, &TreePath::new(vec![0, 0])).unwrap_err();
        assert!(err.is_path_not_found());
    }

    #[test]
    fn test_update_at_leaves_original_untouched() {
        let tree = sample_tree();
        let path = TreePath::new(vec![0]);

        let next = update_at::<_, TemplateError>(&tree, &path, |node| {
            node.bookmark_name = Some("Cover".to_string());
            Ok(())
        })
        .unwrap();

        assert_eq!(resolve_path(&tree, &path).unwrap().bookmark_name, None);
        assert_eq!(
            resolve_path(&next, &path).unwrap().bookmark_name.as_deref(),
            Some("Cover")
        );
    }

    #[test]
    fn test_walk_is_preorder_and_find_path() {
        let tree = sample_tree();
        let paths: Vec<TreePath> = walk(&tree).map(|(path, _)| path).collect();

        assert_eq!(
            paths,
            vec![
                TreePath::root(),
                TreePath::new(vec![0]),
                TreePath::new(vec![1]),
                TreePath::new(vec![1, 0]),
            ]
        );

        let leaf_id = resolve_path(&tree, &TreePath::new(vec![1, 0])).unwrap().id.clone();
        assert_eq!(find_path(&tree, &leaf_id), Some(TreePath::new(vec![1, 0])));
        assert_eq!(find_path(&tree, "missing"), None);
    }

    #[test]
    fn test_compose_directory() {
        assert_eq!(compose_directory("/reports", "./"), "/reports");
        assert_eq!(compose_directory("/reports", "B"), "/reports/B");
        assert_eq!(compose_directory("/reports", "./Raw Data\\QC"), "/reports/Raw Data/QC");
        assert_eq!(compose_directory("/reports", "/elsewhere"), "/elsewhere");
        assert_eq!(compose_directory("", "/root"), "/root");
    }

    #[test]
    fn test_effective_directories() {
        let tree = sample_tree();
        let dirs = effective_directories(&tree);

        let cover = &tree.children().unwrap()[0];
        let inner = &tree.children().unwrap()[1];
        let leaf = &inner.children().unwrap()[0];

        assert_eq!(dirs[&tree.id], "/reports/job-1");
        assert_eq!(dirs[&cover.id], "/reports/job-1");
        assert_eq!(dirs[&inner.id], "/reports/job-1/B");
        assert_eq!(dirs[&leaf.id], "/reports/job-1/B");
    }

    #[test]
    fn test_parent_and_index() {
        assert_eq!(TreePath::root().parent_and_index(), None);
        assert_eq!(
            TreePath::new(vec![2, 1]).parent_and_index(),
            Some((TreePath::new(vec![2]), 1))
        );
        assert!(TreePath::new(vec![2]).is_ancestor_of(&TreePath::new(vec![2, 1])));
    }
}
