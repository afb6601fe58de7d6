//! Method-code filtering.
//!
//! Sections may be restricted to analytical method codes. Given the codes
//! present in a job, sections whose codes share nothing with them are
//! removed along with their subtrees.

use crate::model::Node;
use std::collections::BTreeSet;

/// Copy of `tree` without the sections excluded by `available` codes.
/// Leaves and unrestricted sections are always kept, and so is the root.
pub fn filter_by_method_codes(tree: &Node, available: &BTreeSet<String>) -> Node {
    let mut filtered = tree.clone();
    retain_included(&mut filtered, available);
    filtered
}

/// Whether a node survives filtering on its own merits
pub fn is_included(node: &Node, available: &BTreeSet<String>) -> bool {
    match node.section() {
        Some(section) if !section.method_codes.is_empty() => section
            .method_codes
            .iter()
            .any(|code| available.contains(code)),
        _ => true,
    }
}

fn retain_included(node: &mut Node, available: &BTreeSet<String>) {
    if let Some(children) = node.children_mut() {
        children.retain(|child| is_included(child, available));
        for child in children.iter_mut() {
            retain_included(child, available);
        }
    }
}
