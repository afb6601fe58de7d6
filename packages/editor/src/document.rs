//! # Template Document
//!
//! The single owner of the template tree being edited. Every change goes
//! through [`TemplateDocument::apply`], which runs the mutation and its
//! post-effects as one atomic step.
//!
//! ## Lifecycle
//!
//! ```text
//! load_json → mark all stale → SetTree → edit / resolve ... → to_json
//!                                  ↓                            ↓
//!                           saved snapshot                  mark_saved
//! ```
//!
//! Alongside the tree the document keeps:
//! - the last-saved snapshot and the derived unsaved flag;
//! - a stale epoch per node id, bumped every time the node is marked stale,
//!   so an asynchronous result can tell whether it is still wanted.

use crate::post_effects::PostEffectEngine;
use crate::{EditorError, Mutation, MutationResult};
use binder_template::{
    equivalent, from_json, resolve_path, to_json, walk, Node, NodeId, NodePatch,
    TreePath,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Editable report template
#[derive(Debug)]
pub struct TemplateDocument {
    /// Current version number (increments on each applied mutation)
    version: u64,

    tree: Node,

    /// Tree as of the last load or save
    saved: Node,

    unsaved: bool,

    /// Epoch of the most recent stale-marking per node
    stale_epochs: HashMap<NodeId, u64>,
    epoch_counter: u64,

    effects: PostEffectEngine,
}

impl TemplateDocument {
    /// Document holding an empty root section
    pub fn new() -> Self {
        Self::with_tree(Node::empty_root())
    }

    /// Document for an existing tree, which becomes the saved snapshot
    pub fn from_tree(tree: Node) -> Result<Self, EditorError> {
        let mut doc = Self::with_tree(Node::empty_root());
        doc.apply(Mutation::SetTree { tree })?;
        Ok(doc)
    }

    /// Load a saved template. Every node starts stale since derived fields
    /// are never persisted.
    pub fn load_json(source: &str) -> Result<Self, EditorError> {
        let mut tree = from_json(source)?;
        tree.mark_stale(&mut Vec::new());
        Self::from_tree(tree)
    }

    fn with_tree(tree: Node) -> Self {
        Self {
            version: 0,
            saved: tree.clone(),
            tree,
            unsaved: false,
            stale_epochs: HashMap::new(),
            epoch_counter: 0,
            effects: PostEffectEngine::new(),
        }
    }

    /// Replace the post-effect engine
    pub fn with_effects(mut self, effects: PostEffectEngine) -> Self {
        self.effects = effects;
        self
    }

    /// Apply a mutation with its post-effects. On error nothing changes.
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationResult, EditorError> {
        let (next, applied) = self.effects.apply_with_effects(&mutation, &self.tree)?;

        let mut stale = Vec::new();
        for applied_mutation in &applied {
            stale.extend(applied_mutation.stale_targets(&next));
        }

        if let Mutation::SetTree { .. } = mutation {
            self.saved = next.clone();
        }
        self.tree = next;
        self.version += 1;
        self.register_stale(stale);
        if mutation.is_structural() {
            self.prune_epochs();
        }
        self.refresh_unsaved();

        debug!(
            op = mutation.name(),
            version = self.version,
            unsaved = self.unsaved,
            "applied mutation"
        );

        Ok(MutationResult {
            version: self.version,
            unsaved: self.unsaved,
            effects: applied.into_iter().skip(1).collect(),
        })
    }

    /// Put back an earlier tree value (used by undo). The saved snapshot is
    /// kept, and stale nodes in `tree` get fresh epochs so results computed
    /// for the replaced tree are not merged into it.
    pub fn restore(&mut self, tree: Node) {
        let stale: Vec<NodeId> = walk(&tree)
            .filter(|(_, node)| node.stale)
            .map(|(_, node)| node.id.clone())
            .collect();

        self.tree = tree;
        self.version += 1;
        self.register_stale(stale);
        self.prune_epochs();
        self.refresh_unsaved();
    }

    /// Clear the stale flag of every Section whose subtree holds no stale
    /// leaf. Returns the paths that were cleared.
    pub fn settle_sections(&mut self) -> Vec<TreePath> {
        let settled: Vec<TreePath> = walk(&self.tree)
            .filter(|(_, node)| node.is_section() && node.stale && !node.has_stale_leaf())
            .map(|(path, _)| path)
            .collect();

        for path in &settled {
            if let Ok(next) = (Mutation::UpdateNode {
                path: path.clone(),
                patch: NodePatch::stale(false),
            })
            .apply(&self.tree)
            {
                self.tree = next;
            }
        }

        if !settled.is_empty() {
            self.version += 1;
            debug!(count = settled.len(), "settled sections");
        }
        settled
    }

    /// Record the current tree as saved
    pub fn mark_saved(&mut self) {
        self.saved = self.tree.clone();
        self.unsaved = false;
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.unsaved
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub fn saved_snapshot(&self) -> &Node {
        &self.saved
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Node at `path` in the current tree
    pub fn node_at(&self, path: &TreePath) -> Result<&Node, EditorError> {
        Ok(resolve_path(&self.tree, path)?)
    }

    /// Epoch of the last stale-marking of `id`, 0 if it was never marked
    pub fn stale_epoch(&self, id: &str) -> u64 {
        self.stale_epochs.get(id).copied().unwrap_or(0)
    }

    /// Serialize for saving, derived fields stripped
    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(to_json(&self.tree)?)
    }

    fn register_stale(&mut self, ids: Vec<NodeId>) {
        if ids.is_empty() {
            return;
        }
        self.epoch_counter += 1;
        for id in ids {
            self.stale_epochs.insert(id, self.epoch_counter);
        }
    }

    fn prune_epochs(&mut self) {
        let live: HashSet<&NodeId> = walk(&self.tree).map(|(_, node)| &node.id).collect();
        self.stale_epochs.retain(|id, _| live.contains(id));
    }

    fn refresh_unsaved(&mut self) {
        self.unsaved = !equivalent(&self.tree, &self.saved);
    }
}

impl Default for TemplateDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binder_template::{create_default_node, NodeKind};

    fn doc_with_leaf() -> TemplateDocument {
        let mut root = Node::empty_root();
        root.add_child(create_default_node(NodeKind::MatcherLeaf), None)
            .unwrap();
        TemplateDocument::from_tree(root).unwrap()
    }

    #[test]
    fn test_from_tree_is_clean() {
        let doc = doc_with_leaf();
        assert!(!doc.is_dirty());
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_edit_then_revert_is_clean() {
        let mut doc = doc_with_leaf();
        let path = TreePath::new(vec![0]);

        doc.apply(Mutation::UpdateNode {
            path: path.clone(),
            patch: NodePatch::bookmark(Some("COA".into())),
        })
        .unwrap();
        assert!(doc.is_dirty());

        doc.apply(Mutation::UpdateNode {
            path,
            patch: NodePatch::bookmark(None),
        })
        .unwrap();
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_failed_mutation_changes_nothing() {
        let mut doc = doc_with_leaf();
        let version = doc.version();
        let before = doc.tree().clone();

        let result = doc.apply(Mutation::DeleteNode {
            path: TreePath::new(vec![5]),
        });

        assert!(result.unwrap_err().is_path_not_found());
        assert_eq!(doc.version(), version);
        assert_eq!(doc.tree(), &before);
    }

    #[test]
    fn test_mark_stale_bumps_epochs() {
        let mut doc = doc_with_leaf();
        let leaf_id = doc.tree().children().unwrap()[0].id.clone();
        assert_eq!(doc.stale_epoch(&leaf_id), 0);

        doc.apply(Mutation::MarkStale {
            path: TreePath::root(),
        })
        .unwrap();
        let first = doc.stale_epoch(&leaf_id);

        doc.apply(Mutation::MarkStale {
            path: TreePath::new(vec![0]),
        })
        .unwrap();

        assert!(first > 0);
        assert!(doc.stale_epoch(&leaf_id) > first);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_settle_sections_waits_for_leaves() {
        let mut doc = doc_with_leaf();
        doc.apply(Mutation::MarkStale {
            path: TreePath::root(),
        })
        .unwrap();

        assert!(doc.settle_sections().is_empty());
        assert!(doc.tree().stale);

        doc.apply(Mutation::UpdateNode {
            path: TreePath::new(vec![0]),
            patch: NodePatch::stale(false),
        })
        .unwrap();

        assert_eq!(doc.settle_sections(), vec![TreePath::root()]);
        assert!(!doc.tree().stale);
    }

    #[test]
    fn test_load_marks_everything_stale() {
        let source = r#"{
            "type": "Section",
            "id": "root",
            "base_directory": "./",
            "children": [
                {"type": "FileType", "id": "coa", "filename_text_to_match": "COA"}
            ]
        }"#;

        let doc = TemplateDocument::load_json(source).unwrap();

        assert!(walk(doc.tree()).all(|(_, node)| node.stale));
        assert!(doc.stale_epoch("coa") > 0);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_deleted_nodes_lose_their_epoch() {
        let mut doc = doc_with_leaf();
        let leaf_id = doc.tree().children().unwrap()[0].id.clone();
        doc.apply(Mutation::MarkStale {
            path: TreePath::root(),
        })
        .unwrap();

        doc.apply(Mutation::DeleteNode {
            path: TreePath::new(vec![0]),
        })
        .unwrap();

        assert_eq!(doc.stale_epoch(&leaf_id), 0);
    }
}
