//! # Post-Effect System
//!
//! Some edits invalidate derived data elsewhere in the tree. Post-effects
//! look at a primary mutation together with the trees before and after it
//! and produce the secondary mutations that keep the template consistent:
//!
//! - Changing a Section's base directory → its whole subtree is re-resolved
//! - Changing a leaf's matching rule or document path → that leaf is
//!   re-resolved
//!
//! Post-effects are:
//! - **Deterministic**: same mutation and trees, same effects
//! - **Minimal**: only edits that actually change a field trigger anything
//! - **Composable**: several effects may fire for one mutation

use crate::mutations::Mutation;
use binder_template::{resolve_path, Node, NodeBody, NodePatch};
use tracing::debug;

/// Post-effect that can be triggered by a mutation
pub trait PostEffect: std::fmt::Debug + Send + Sync {
    /// Analyze the mutation and generate secondary mutations if needed
    fn analyze(&self, mutation: &Mutation, before: &Node, after: &Node) -> Vec<Mutation>;
}

/// Re-resolve a section's subtree when its base directory changes
#[derive(Debug)]
pub struct InvalidateOnBaseDirectoryChange;

impl PostEffect for InvalidateOnBaseDirectoryChange {
    fn analyze(&self, mutation: &Mutation, before: &Node, _after: &Node) -> Vec<Mutation> {
        let Mutation::UpdateNode { path, patch } = mutation else {
            return vec![];
        };
        let Some(new_dir) = &patch.base_directory else {
            return vec![];
        };

        let changed = resolve_path(before, path)
            .ok()
            .and_then(Node::section)
            .is_some_and(|section| &section.base_directory != new_dir);

        if changed {
            vec![Mutation::MarkStale { path: path.clone() }]
        } else {
            vec![]
        }
    }
}

/// Re-resolve a leaf when what it points at changes
#[derive(Debug)]
pub struct InvalidateOnRuleChange;

impl InvalidateOnRuleChange {
    fn rule_changed(node: &Node, patch: &NodePatch) -> bool {
        match &node.body {
            NodeBody::Matcher(matcher) => {
                differs(&patch.directory_source, &matcher.directory_source)
                    || differs(&patch.match_expression, &matcher.match_expression)
            }
            NodeBody::Document(document) => differs(&patch.document_path, &document.document_path),
            NodeBody::Section(_) => false,
        }
    }
}

impl PostEffect for InvalidateOnRuleChange {
    fn analyze(&self, mutation: &Mutation, before: &Node, _after: &Node) -> Vec<Mutation> {
        match mutation {
            Mutation::UpdateNode { path, patch } => match resolve_path(before, path) {
                Ok(node) if Self::rule_changed(node, patch) => {
                    vec![Mutation::MarkStale { path: path.clone() }]
                }
                _ => vec![],
            },
            _ => vec![],
        }
    }
}

fn differs(patched: &Option<String>, current: &str) -> bool {
    patched.as_deref().is_some_and(|value| value != current)
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![
                Box::new(InvalidateOnBaseDirectoryChange),
                Box::new(InvalidateOnRuleChange),
            ],
        }
    }

    /// Engine with a custom set of effects
    pub fn with_effects(effects: Vec<Box<dyn PostEffect>>) -> Self {
        Self { effects }
    }

    /// Engine that never produces secondary mutations
    pub fn none() -> Self {
        Self::with_effects(Vec::new())
    }

    /// Analyze a mutation and generate all secondary mutations
    pub fn analyze(&self, mutation: &Mutation, before: &Node, after: &Node) -> Vec<Mutation> {
        let mut secondary_mutations = Vec::new();

        for effect in &self.effects {
            let mut effect_mutations = effect.analyze(mutation, before, after);
            secondary_mutations.append(&mut effect_mutations);
        }

        secondary_mutations
    }

    /// Apply a mutation and then its post-effects, returning the final tree
    /// and every mutation applied (primary first)
    pub fn apply_with_effects(
        &self,
        mutation: &Mutation,
        tree: &Node,
    ) -> Result<(Node, Vec<Mutation>), crate::MutationError> {
        let mut next = mutation.apply(tree)?;
        let mut applied_mutations = vec![mutation.clone()];

        let secondary = self.analyze(mutation, tree, &next);
        for secondary_mutation in secondary {
            debug!(
                primary = mutation.name(),
                effect = secondary_mutation.name(),
                "applying post-effect"
            );
            next = secondary_mutation.apply(&next)?;
            applied_mutations.push(secondary_mutation);
        }

        Ok((next, applied_mutations))
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binder_template::{create_default_node, NodeKind, TreePath};

    fn tree() -> Node {
        let mut section = create_default_node(NodeKind::Section);
        section.section_mut().unwrap().base_directory = "B".to_string();
        section
            .add_child(create_default_node(NodeKind::MatcherLeaf), None)
            .unwrap();
        let mut root = Node::empty_root();
        root.add_child(section, None).unwrap();
        root
    }

    #[test]
    fn test_post_effect_engine_creation() {
        let engine = PostEffectEngine::new();
        assert_eq!(engine.effects.len(), 2);
    }

    #[test]
    fn test_base_directory_change_marks_subtree() {
        let tree = tree();
        let engine = PostEffectEngine::new();
        let mutation = Mutation::UpdateNode {
            path: TreePath::root(),
            patch: NodePatch::base_directory("C:/Jobs/12"),
        };

        let (next, applied) = engine.apply_with_effects(&mutation, &tree).unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(
            applied[1],
            Mutation::MarkStale {
                path: TreePath::root()
            }
        );
        let leaf = &next.children().unwrap()[0].children().unwrap()[0];
        assert!(leaf.stale);
    }

    #[test]
    fn test_unchanged_base_directory_is_quiet() {
        let tree = tree();
        let mutation = Mutation::UpdateNode {
            path: TreePath::new(vec![0]),
            patch: NodePatch::base_directory("B"),
        };

        let secondary = PostEffectEngine::new().analyze(&mutation, &tree, &tree);
        assert!(secondary.is_empty());
    }

    #[test]
    fn test_rule_change_marks_leaf() {
        let tree = tree();
        let path = TreePath::new(vec![0, 0]);
        let mutation = Mutation::UpdateNode {
            path: path.clone(),
            patch: NodePatch {
                match_expression: Some("COA".into()),
                ..Default::default()
            },
        };

        let secondary = InvalidateOnRuleChange.analyze(&mutation, &tree, &tree);
        assert_eq!(secondary, vec![Mutation::MarkStale { path }]);
    }

    #[test]
    fn test_bookmark_edit_has_no_effects() {
        let tree = tree();
        let mutation = Mutation::UpdateNode {
            path: TreePath::new(vec![0, 0]),
            patch: NodePatch::bookmark(Some("Results".into())),
        };

        assert!(PostEffectEngine::new().analyze(&mutation, &tree, &tree).is_empty());
    }
}
