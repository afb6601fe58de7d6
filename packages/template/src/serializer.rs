//! Template persistence codec.
//!
//! Reading accepts files written by older editors: unknown keys are ignored,
//! missing optional keys take their defaults, and bindings kept on sections
//! are moved onto the documents they fill. Writing strips derived data,
//! since it is recomputed by re-resolution after every load.

use crate::error::TemplateError;
use crate::id_generator::new_id;
use crate::model::{validate_tree, DocumentLeaf, Node, NodeBody, TemplateVariable};
use crate::schema::strip_volatile;

/// Parse and validate a template tree
pub fn from_json(source: &str) -> Result<Node, TemplateError> {
    let mut tree: Node = serde_json::from_str(source)?;
    migrate_legacy_variables(&mut tree);
    validate_tree(&tree)?;
    Ok(tree)
}

/// Serialize `tree` for saving, without derived fields
pub fn to_json(tree: &Node) -> Result<String, TemplateError> {
    let mut clean = tree.clone();
    strip_volatile(&mut clean);
    Ok(serde_json::to_string_pretty(&clean)?)
}

/// Hand each section's legacy bindings to its direct DocumentLeaf children
fn migrate_legacy_variables(node: &mut Node) {
    let Some(section) = node.section_mut() else {
        return;
    };
    let legacy = std::mem::take(&mut section.legacy_variables);

    for child in &mut section.children {
        if let NodeBody::Document(document) = &mut child.body {
            for variable in &legacy {
                adopt_binding(document, variable);
            }
        }
        migrate_legacy_variables(child);
    }
}

/// A document takes a binding it lists among its variables, or any binding
/// when it was never scanned. Values the document already has win.
fn adopt_binding(document: &mut DocumentLeaf, legacy: &TemplateVariable) {
    let wanted = document.variables_in_doc.is_empty()
        || document.variables_in_doc.contains(&legacy.key);
    if !wanted {
        return;
    }

    match document
        .variables
        .iter_mut()
        .find(|variable| variable.key == legacy.key)
    {
        Some(existing) if existing.value.is_empty() => {
            existing.value = legacy.value.clone();
            existing.is_constant = legacy.is_constant;
            existing.bookmark_for_page_number = legacy.bookmark_for_page_number.clone();
            existing.use_beginning_of_bookmark = legacy.use_beginning_of_bookmark;
        }
        Some(_) => {}
        None => document.variables.push(TemplateVariable {
            id: new_id(),
            ..legacy.clone()
        }),
    }
}
