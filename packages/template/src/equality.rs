//! # Equality / Diff Engine
//!
//! Answers "would saving this tree change the file?". Two trees are
//! equivalent when they are equal after every volatile field listed in
//! [`crate::schema`] has been erased. Comparison is structural and
//! order-sensitive over children; method codes compare as sets.

use crate::model::{Node, NodeBody};
use crate::path::TreePath;
use crate::schema::erase_volatile;
use serde::Serialize;

/// Where two trees differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Difference {
    /// Node-local persisted fields differ
    Modified { path: TreePath },
    /// Different variants at the same position
    KindChanged { path: TreePath },
    /// Child lists differ in length
    ChildrenChanged {
        path: TreePath,
        before: usize,
        after: usize,
    },
}

impl Difference {
    pub fn path(&self) -> &TreePath {
        match self {
            Difference::Modified { path }
            | Difference::KindChanged { path }
            | Difference::ChildrenChanged { path, .. } => path,
        }
    }
}

/// True when `a` and `b` are the same template for save purposes
pub fn equivalent(a: &Node, b: &Node) -> bool {
    if a.kind() != b.kind() || persisted_view(a) != persisted_view(b) {
        return false;
    }

    match (a.children(), b.children()) {
        (Some(left), Some(right)) => {
            left.len() == right.len()
                && left.iter().zip(right).all(|(l, r)| equivalent(l, r))
        }
        _ => true,
    }
}

/// Every position at which `before` and `after` differ, pre-order.
/// Empty exactly when the trees are [`equivalent`].
pub fn differences(before: &Node, after: &Node) -> Vec<Difference> {
    let mut out = Vec::new();
    diff_into(before, after, TreePath::root(), &mut out);
    out
}

fn diff_into(before: &Node, after: &Node, path: TreePath, out: &mut Vec<Difference>) {
    if before.kind() != after.kind() {
        out.push(Difference::KindChanged { path });
        return;
    }

    if persisted_view(before) != persisted_view(after) {
        out.push(Difference::Modified { path: path.clone() });
    }

    if let (Some(left), Some(right)) = (before.children(), after.children()) {
        if left.len() != right.len() {
            out.push(Difference::ChildrenChanged {
                path: path.clone(),
                before: left.len(),
                after: right.len(),
            });
        }
        for (index, (l, r)) in left.iter().zip(right).enumerate() {
            diff_into(l, r, path.child(index), out);
        }
    }
}

/// Shallow copy of a node with children dropped, volatile fields erased
/// and method codes in canonical order
fn persisted_view(node: &Node) -> Node {
    let mut view = Node {
        id: node.id.clone(),
        bookmark_name: node.bookmark_name.clone(),
        stale: node.stale,
        body: match &node.body {
            NodeBody::Section(section) => {
                let mut codes = section.method_codes.clone();
                codes.sort();
                codes.dedup();
                NodeBody::Section(crate::model::Section {
                    base_directory: section.base_directory.clone(),
                    method_codes: codes,
                    children: Vec::new(),
                    legacy_variables: Vec::new(),
                })
            }
            other => other.clone(),
        },
    };
    erase_volatile(&mut view);
    view
}
