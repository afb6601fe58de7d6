//! Property tests over arbitrary template trees

use binder_editor::{Mutation, TemplateDocument};
use binder_template::{
    differences, equivalent, resolve_path, walk, Difference, IdGenerator, Node, NodeBody, NodeKind,
    NodePatch, ResolvedFile, TreePath,
};
use proptest::prelude::*;
use proptest::sample::Index;

#[derive(Debug, Clone)]
enum Shape {
    Matcher(String),
    Document(String),
    Section(String, Vec<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        "[A-Z]{0,6}".prop_map(Shape::Matcher),
        "[a-z]{1,6}\\.docx".prop_map(Shape::Document),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        ("[A-Za-z ]{0,6}", prop::collection::vec(inner, 0..4))
            .prop_map(|(dir, children)| Shape::Section(dir, children))
    })
}

fn build(shape: &Shape, ids: &mut IdGenerator) -> Node {
    match shape {
        Shape::Matcher(expression) => {
            let mut node = Node::new_default(NodeKind::MatcherLeaf, ids);
            if let NodeBody::Matcher(matcher) = &mut node.body {
                matcher.match_expression = expression.clone();
            }
            node
        }
        Shape::Document(path) => {
            let mut node = Node::new_default(NodeKind::DocumentLeaf, ids);
            if let NodeBody::Document(document) = &mut node.body {
                document.document_path = path.clone();
            }
            node
        }
        Shape::Section(dir, children) => {
            let mut node = Node::new_default(NodeKind::Section, ids);
            node.section_mut().unwrap().base_directory = dir.clone();
            for child in children {
                node.add_child(build(child, ids), None).unwrap();
            }
            node
        }
    }
}

fn tree() -> impl Strategy<Value = Node> {
    prop::collection::vec(shape(), 0..5).prop_map(|children| {
        let mut ids = IdGenerator::from_seed("node");
        let mut root = Node::new_default(NodeKind::Section, &mut ids);
        for child in &children {
            root.add_child(build(child, &mut ids), None).unwrap();
        }
        root
    })
}

fn paths_where(tree: &Node, keep: impl Fn(&Node) -> bool) -> Vec<TreePath> {
    walk(tree)
        .filter(|(_, node)| keep(node))
        .map(|(path, _)| path)
        .collect()
}

/// Same tree after a full resolution pass: everything stale, every matcher
/// holding files, every document found
fn resolved_copy(tree: &Node) -> Node {
    let mut copy = Mutation::MarkStale {
        path: TreePath::root(),
    }
    .apply(tree)
    .unwrap();

    for path in paths_where(tree, |node| !node.is_section()) {
        let node = resolve_path(&copy, &path).unwrap();
        let patch = match &node.body {
            NodeBody::Matcher(_) => NodePatch {
                resolved_files: Some(vec![ResolvedFile::new("found.pdf", Some(4))]),
                ..Default::default()
            },
            _ => NodePatch {
                exists: Some(true),
                variables_in_doc: Some(vec!["{client}".to_string()]),
                ..Default::default()
            },
        };
        copy = Mutation::UpdateNode { path, patch }.apply(&copy).unwrap();
    }
    copy
}

proptest! {
    #[test]
    fn equivalence_is_reflexive(tree in tree()) {
        prop_assert!(equivalent(&tree, &tree));
        prop_assert!(differences(&tree, &tree).is_empty());
    }

    #[test]
    fn equivalence_ignores_derived_fields(tree in tree()) {
        let resolved = resolved_copy(&tree);
        prop_assert!(equivalent(&tree, &resolved));
    }

    #[test]
    fn update_is_local(tree in tree(), pick in any::<Index>()) {
        let paths = paths_where(&tree, |_| true);
        let path = pick.get(&paths).clone();

        let next = Mutation::UpdateNode {
            path: path.clone(),
            patch: NodePatch::bookmark(Some("Renamed".to_string())),
        }
        .apply(&tree)
        .unwrap();

        let updated = resolve_path(&next, &path).unwrap();
        prop_assert_eq!(updated.bookmark_name.as_deref(), Some("Renamed"));
        prop_assert_eq!(differences(&tree, &next), vec![Difference::Modified { path }]);
    }

    #[test]
    fn set_tree_is_never_unsaved(tree in tree()) {
        let mut doc = TemplateDocument::new();
        let result = doc.apply(Mutation::SetTree { tree }).unwrap();

        prop_assert!(!result.unsaved);
        prop_assert!(!doc.is_dirty());
    }

    #[test]
    fn mark_saved_is_never_unsaved(tree in tree(), pick in any::<Index>()) {
        let mut doc = TemplateDocument::from_tree(tree.clone()).unwrap();
        let paths = paths_where(&tree, |_| true);
        let path = pick.get(&paths).clone();

        doc.apply(Mutation::UpdateNode {
            path,
            patch: NodePatch::bookmark(Some("Edited".to_string())),
        })
        .unwrap();
        doc.mark_saved();

        prop_assert!(!doc.is_dirty());
    }

    #[test]
    fn move_sibling_round_trips(
        tree in tree(),
        pick in any::<Index>(),
        from in any::<Index>(),
        to in any::<Index>(),
    ) {
        let sections = paths_where(&tree, |node| {
            node.children().is_some_and(|children| !children.is_empty())
        });
        prop_assume!(!sections.is_empty());

        let parent_path = pick.get(&sections).clone();
        let len = resolve_path(&tree, &parent_path).unwrap().children().unwrap().len();
        let (i, j) = (from.index(len), to.index(len));

        let moved = Mutation::MoveSibling { parent_path: parent_path.clone(), from: i, to: j }
            .apply(&tree)
            .unwrap();
        let restored = Mutation::MoveSibling { parent_path, from: j, to: i }
            .apply(&moved)
            .unwrap();

        prop_assert_eq!(&restored, &tree);
        if i == j {
            prop_assert_eq!(&moved, &tree);
        }
    }

    #[test]
    fn mark_stale_reaches_every_descendant(tree in tree(), pick in any::<Index>()) {
        let sections = paths_where(&tree, Node::is_section);
        let path = pick.get(&sections).clone();

        let next = Mutation::MarkStale { path: path.clone() }.apply(&tree).unwrap();

        for (other, node) in walk(&next) {
            let inside = other == path || path.is_ancestor_of(&other);
            prop_assert_eq!(node.stale, inside);
        }
    }
}
