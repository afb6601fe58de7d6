//! # Template Mutations
//!
//! The complete vocabulary of edits on a template tree. Every change the
//! editor makes, whether it comes from the user, from a post-effect or from
//! resolution merge-back, is one of these values.
//!
//! ## Semantics
//!
//! - **Pure**: [`Mutation::apply`] takes the current tree and returns the
//!   next one. The input is never modified, so a failed edit leaves the
//!   document exactly as it was.
//! - **Path addressed**: targets are child-index paths from the root.
//!   Asynchronous callers that only know a node id look the path up at the
//!   moment they apply.
//! - **Validated**: structural constraints (sections only hold children,
//!   ids are unique, the root stays a Section) are checked before the new
//!   tree is returned.

use binder_template::model::check_unique_ids;
use binder_template::{
    resolve_path, update_at, validate_tree, walk, Node, NodeBody, NodeId, NodePatch, TemplateError,
    TreePath,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Edit intents, deserializable straight from `{ "op": ..., ... }` messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Replace the whole tree
    SetTree { tree: Node },

    /// Shallow-merge `patch` into the node at `path`
    UpdateNode { path: TreePath, patch: NodePatch },

    /// Insert `node` under the Section at `path` (append when no index)
    InsertChild {
        path: TreePath,
        node: Node,
        #[serde(default)]
        index: Option<usize>,
    },

    /// Remove the node at `path` and its subtree
    DeleteNode { path: TreePath },

    /// Reorder a child within its parent
    MoveSibling {
        parent_path: TreePath,
        from: usize,
        to: usize,
    },

    /// Mark the node at `path` and all its descendants stale
    MarkStale { path: TreePath },

    /// Bookmark every resolved file of a MatcherLeaf by its file name
    BookmarkFilesByName { path: TreePath },
}

#[derive(Error, Debug)]
pub enum MutationError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Index {index} out of range for {len} children at {path}")]
    IndexOutOfRange {
        path: TreePath,
        index: usize,
        len: usize,
    },
}

impl MutationError {
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, MutationError::Template(err) if err.is_path_not_found())
    }
}

impl Mutation {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetTree { .. } => "set_tree",
            Mutation::UpdateNode { .. } => "update_node",
            Mutation::InsertChild { .. } => "insert_child",
            Mutation::DeleteNode { .. } => "delete_node",
            Mutation::MoveSibling { .. } => "move_sibling",
            Mutation::MarkStale { .. } => "mark_stale",
            Mutation::BookmarkFilesByName { .. } => "bookmark_files_by_name",
        }
    }

    /// Whether this mutation can add, remove or move nodes
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Mutation::SetTree { .. }
                | Mutation::InsertChild { .. }
                | Mutation::DeleteNode { .. }
                | Mutation::MoveSibling { .. }
        )
    }

    /// Apply to `tree`, returning the next tree
    pub fn apply(&self, tree: &Node) -> Result<Node, MutationError> {
        match self {
            Mutation::SetTree { tree: replacement } => {
                validate_tree(replacement)?;
                Ok(replacement.clone())
            }

            Mutation::UpdateNode { path, patch } => Self::apply_update(tree, path, patch),

            Mutation::InsertChild { path, node, index } => {
                Self::apply_insert(tree, path, node, *index)
            }

            Mutation::DeleteNode { path } => Self::apply_delete(tree, path),

            Mutation::MoveSibling {
                parent_path,
                from,
                to,
            } => Self::apply_move(tree, parent_path, *from, *to),

            Mutation::MarkStale { path } => update_at(tree, path, |node| {
                node.mark_stale(&mut Vec::new());
                Ok(())
            }),

            Mutation::BookmarkFilesByName { path } => {
                update_at(tree, path, |node| {
                    let kind = node.kind();
                    match &mut node.body {
                        NodeBody::Matcher(matcher) => {
                            for file in &mut matcher.resolved_files {
                                file.bookmark_name = Some(file.filename_bookmark());
                            }
                            Ok(())
                        }
                        _ => Err(TemplateError::InvalidStructure(format!(
                            "only FileType nodes have files to bookmark, found {}",
                            kind
                        ))
                        .into()),
                    }
                })
            }
        }
    }

    /// Ids this mutation (re)marked stale in `next`, the tree it produced
    pub fn stale_targets(&self, next: &Node) -> Vec<NodeId> {
        match self {
            Mutation::SetTree { tree } => stale_ids(tree),
            Mutation::InsertChild { node, .. } => stale_ids(node),
            Mutation::MarkStale { path } => {
                let mut ids = Vec::new();
                if let Ok(node) = resolve_path(next, path) {
                    node.collect_ids(&mut ids);
                }
                ids
            }
            Mutation::UpdateNode { path, patch } if patch.stale == Some(true) => {
                resolve_path(next, path)
                    .map(|node| vec![node.id.clone()])
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    fn apply_update(tree: &Node, path: &TreePath, patch: &NodePatch) -> Result<Node, MutationError> {
        let sets_codes = patch
            .method_codes
            .as_ref()
            .is_some_and(|codes| !codes.is_empty());
        if path.is_root() && sets_codes {
            return Err(TemplateError::InvalidStructure(
                "the root section cannot carry method codes".to_string(),
            )
            .into());
        }

        update_at(tree, path, |node| patch.apply_to(node).map_err(MutationError::from))
    }

    fn apply_insert(
        tree: &Node,
        path: &TreePath,
        node: &Node,
        index: Option<usize>,
    ) -> Result<Node, MutationError> {
        let mut existing = Vec::new();
        tree.collect_ids(&mut existing);
        let existing: HashSet<&NodeId> = existing.iter().collect();

        let mut incoming = Vec::new();
        node.collect_ids(&mut incoming);
        check_unique_ids(incoming.iter(), &existing)?;

        update_at(tree, path, |parent| {
            parent
                .add_child(node.clone(), index)
                .map_err(MutationError::from)
        })
    }

    fn apply_delete(tree: &Node, path: &TreePath) -> Result<Node, MutationError> {
        let (parent_path, index) = path
            .parent_and_index()
            .ok_or(TemplateError::RootNotDeletable)?;

        update_at(tree, &parent_path, |parent| {
            match parent.children_mut() {
                Some(children) if index < children.len() => {
                    children.remove(index);
                    Ok(())
                }
                _ => Err(TemplateError::PathNotFound(path.clone()).into()),
            }
        })
    }

    fn apply_move(
        tree: &Node,
        parent_path: &TreePath,
        from: usize,
        to: usize,
    ) -> Result<Node, MutationError> {
        update_at(tree, parent_path, |parent| {
            let kind = parent.kind();
            let children = parent.children_mut().ok_or_else(|| {
                TemplateError::InvalidStructure(format!("{} nodes have no children to reorder", kind))
            })?;

            let len = children.len();
            for index in [from, to] {
                if index >= len {
                    return Err(MutationError::IndexOutOfRange {
                        path: parent_path.clone(),
                        index,
                        len,
                    });
                }
            }

            if from != to {
                let moved = children.remove(from);
                children.insert(to, moved);
            }
            Ok(())
        })
    }
}

fn stale_ids(tree: &Node) -> Vec<NodeId> {
    walk(tree)
        .filter(|(_, node)| node.stale)
        .map(|(_, node)| node.id.clone())
        .collect()
}

/// Result of applying a mutation to a document
#[derive(Debug, Clone)]
pub struct MutationResult {
    /// New version number
    pub version: u64,

    /// Whether the tree now differs from the saved snapshot
    pub unsaved: bool,

    /// Secondary mutations produced by post-effects, in application order
    pub effects: Vec<Mutation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use binder_template::{create_default_node, equivalent, NodeKind};

    fn root_with(kinds: &[NodeKind]) -> Node {
        let mut root = Node::empty_root();
        for kind in kinds {
            root.add_child(create_default_node(*kind), None).unwrap();
        }
        root
    }

    #[test]
    fn test_apply_is_pure() {
        let tree = root_with(&[NodeKind::MatcherLeaf]);
        let before = tree.clone();

        let next = Mutation::DeleteNode {
            path: TreePath::new(vec![0]),
        }
        .apply(&tree)
        .unwrap();

        assert_eq!(tree, before);
        assert!(next.children().unwrap().is_empty());
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let tree = root_with(&[]);
        let err = Mutation::DeleteNode {
            path: TreePath::root(),
        }
        .apply(&tree)
        .unwrap_err();

        assert!(matches!(
            err,
            MutationError::Template(TemplateError::RootNotDeletable)
        ));
    }

    #[test]
    fn test_insert_into_leaf_fails() {
        let tree = root_with(&[NodeKind::DocumentLeaf]);
        let err = Mutation::InsertChild {
            path: TreePath::new(vec![0]),
            node: create_default_node(NodeKind::MatcherLeaf),
            index: None,
        }
        .apply(&tree)
        .unwrap_err();

        assert!(matches!(
            err,
            MutationError::Template(TemplateError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let tree = root_with(&[NodeKind::MatcherLeaf]);
        let duplicate = tree.children().unwrap()[0].clone();

        let err = Mutation::InsertChild {
            path: TreePath::root(),
            node: duplicate,
            index: None,
        }
        .apply(&tree)
        .unwrap_err();

        assert!(matches!(
            err,
            MutationError::Template(TemplateError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_insert_index_is_clamped() {
        let tree = root_with(&[NodeKind::Section]);
        let leaf = create_default_node(NodeKind::MatcherLeaf);
        let leaf_id = leaf.id.clone();

        let next = Mutation::InsertChild {
            path: TreePath::root(),
            node: leaf,
            index: Some(99),
        }
        .apply(&tree)
        .unwrap();

        assert_eq!(next.children().unwrap()[1].id, leaf_id);
    }

    #[test]
    fn test_move_sibling() {
        let tree = root_with(&[NodeKind::Section, NodeKind::MatcherLeaf, NodeKind::DocumentLeaf]);
        let ids: Vec<NodeId> = tree.children().unwrap().iter().map(|c| c.id.clone()).collect();

        let next = Mutation::MoveSibling {
            parent_path: TreePath::root(),
            from: 0,
            to: 2,
        }
        .apply(&tree)
        .unwrap();

        let moved: Vec<&NodeId> = next.children().unwrap().iter().map(|c| &c.id).collect();
        assert_eq!(moved, vec![&ids[1], &ids[2], &ids[0]]);
    }

    #[test]
    fn test_move_sibling_out_of_range() {
        let tree = root_with(&[NodeKind::Section]);
        let err = Mutation::MoveSibling {
            parent_path: TreePath::root(),
            from: 0,
            to: 1,
        }
        .apply(&tree)
        .unwrap_err();

        assert!(matches!(
            err,
            MutationError::IndexOutOfRange { index: 1, len: 1, .. }
        ));
    }

    #[test]
    fn test_update_missing_path() {
        let tree = root_with(&[]);
        let err = Mutation::UpdateNode {
            path: TreePath::new(vec![3]),
            patch: NodePatch::bookmark(Some("x".into())),
        }
        .apply(&tree)
        .unwrap_err();

        assert!(err.is_path_not_found());
    }

    #[test]
    fn test_root_rejects_method_codes() {
        let tree = root_with(&[]);
        let patch = NodePatch {
            method_codes: Some(vec!["8260".into()]),
            ..Default::default()
        };

        let result = Mutation::UpdateNode {
            path: TreePath::root(),
            patch,
        }
        .apply(&tree);

        assert!(matches!(
            result,
            Err(MutationError::Template(TemplateError::InvalidStructure(_)))
        ));
    }

    #[test]
    fn test_mark_stale_targets_whole_subtree() {
        let mut tree = root_with(&[NodeKind::Section]);
        tree.children_mut().unwrap()[0]
            .add_child(create_default_node(NodeKind::MatcherLeaf), None)
            .unwrap();

        let mutation = Mutation::MarkStale {
            path: TreePath::new(vec![0]),
        };
        let next = mutation.apply(&tree).unwrap();

        assert_eq!(mutation.stale_targets(&next).len(), 2);
        assert!(!next.stale);
        assert!(next.children().unwrap()[0].children().unwrap()[0].stale);
    }

    #[test]
    fn test_bookmark_files_by_name_is_not_a_change() {
        let mut tree = root_with(&[NodeKind::MatcherLeaf]);
        if let NodeBody::Matcher(matcher) = &mut tree.children_mut().unwrap()[0].body {
            matcher
                .resolved_files
                .push(binder_template::ResolvedFile::new("Raw/COA 12.pdf", Some(2)));
        }

        let next = Mutation::BookmarkFilesByName {
            path: TreePath::new(vec![0]),
        }
        .apply(&tree)
        .unwrap();

        let file = &next.children().unwrap()[0].matcher().unwrap().resolved_files[0];
        assert_eq!(file.bookmark_name.as_deref(), Some("COA 12"));
        assert!(equivalent(&tree, &next));
    }

    #[test]
    fn test_deserialize_edit_intent() {
        let json = r#"{"op": "move_sibling", "parent_path": [0], "from": 1, "to": 0}"#;
        let mutation: Mutation = serde_json::from_str(json).unwrap();

        assert_eq!(
            mutation,
            Mutation::MoveSibling {
                parent_path: TreePath::new(vec![0]),
                from: 1,
                to: 0
            }
        );
    }
}
