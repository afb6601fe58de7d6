//! Property tests for binding reconciliation and method-code filtering

use binder_template::schema::reconcile_variables;
use binder_template::{
    create_default_node, filter_by_method_codes, walk, Node, NodeKind, TemplateVariable,
};
use proptest::prelude::*;

fn key() -> impl Strategy<Value = String> {
    "\\{[a-e]\\}"
}

proptest! {
    #[test]
    fn reconciled_bindings_match_found_keys(
        existing in prop::collection::btree_map(key(), "[a-z]{0,4}", 0..5),
        found in prop::collection::vec(key(), 0..6),
    ) {
        let existing: Vec<TemplateVariable> = existing
            .into_iter()
            .map(|(key, value)| TemplateVariable::constant(key, value))
            .collect();

        let reconciled = reconcile_variables(&existing, &found);

        for variable in &reconciled {
            prop_assert!(found.contains(&variable.key));
            let earlier = existing.iter().find(|old| old.key == variable.key);
            if let Some(old) = earlier {
                prop_assert_eq!(&variable.value, &old.value);
            } else {
                prop_assert_eq!(variable.value.as_str(), "");
            }
        }
        for key in &found {
            prop_assert!(reconciled.iter().any(|variable| &variable.key == key));
        }
    }

    #[test]
    fn filtering_keeps_only_included_sections(
        sections in prop::collection::vec(prop::collection::vec("[1-4]", 0..3), 0..6),
        available in prop::collection::btree_set("[1-4]", 0..4),
    ) {
        let mut root = Node::empty_root();
        for codes in &sections {
            let mut section = create_default_node(NodeKind::Section);
            section.section_mut().unwrap().method_codes = codes.clone();
            section.add_child(create_default_node(NodeKind::MatcherLeaf), None).unwrap();
            root.add_child(section, None).unwrap();
        }

        let filtered = filter_by_method_codes(&root, &available);

        let expected = sections
            .iter()
            .filter(|codes| codes.is_empty() || codes.iter().any(|code| available.contains(code)))
            .count();
        prop_assert_eq!(filtered.children().unwrap().len(), expected);
        prop_assert_eq!(walk(&filtered).count(), 1 + expected * 2);

        for section in filtered.children().unwrap() {
            let codes = &section.section().unwrap().method_codes;
            prop_assert!(codes.is_empty() || codes.iter().any(|code| available.contains(code)));
        }
    }
}
