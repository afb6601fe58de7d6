//! # Volatile-field schema
//!
//! Per node kind, the fields that are derived by the resolver or are
//! transient editor state rather than user data. Two consumers read this
//! table and nothing else:
//!
//! - the equality engine erases these fields before comparing trees, so
//!   re-resolution never registers as an unsaved change;
//! - resolution merge-back absorbs exactly these fields from a resolver
//!   response into a [`NodePatch`].

use crate::error::TemplateError;
use crate::model::{Node, NodeBody, NodeKind, ResolvedFile, TemplateVariable};
use crate::patch::NodePatch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatileField {
    /// Transient "needs re-resolution" flag
    Stale,
    /// Files matched by a MatcherLeaf (and with them `exists`)
    ResolvedFiles,
    /// Whether a DocumentLeaf's document was found
    Exists,
    /// Variables discovered inside a DocumentLeaf's document
    VariablesInDoc,
    /// Synthetic list ids on variable bindings
    VariableIds,
}

const SECTION_FIELDS: &[VolatileField] = &[VolatileField::Stale];

const MATCHER_FIELDS: &[VolatileField] = &[VolatileField::Stale, VolatileField::ResolvedFiles];

const DOCUMENT_FIELDS: &[VolatileField] = &[
    VolatileField::Stale,
    VolatileField::Exists,
    VolatileField::VariablesInDoc,
    VolatileField::VariableIds,
];

pub fn volatile_fields(kind: NodeKind) -> &'static [VolatileField] {
    match kind {
        NodeKind::Section => SECTION_FIELDS,
        NodeKind::MatcherLeaf => MATCHER_FIELDS,
        NodeKind::DocumentLeaf => DOCUMENT_FIELDS,
    }
}

/// Derived fields reported by the resolver for one leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResolvedFields {
    Matcher {
        files: Vec<ResolvedFile>,
    },
    Document {
        exists: bool,
        variables_in_doc: Vec<String>,
    },
}

impl ResolvedFields {
    /// Extract the derived fields from a node echoed back by a resolver
    pub fn from_node(node: &Node) -> Option<Self> {
        match &node.body {
            NodeBody::Section(_) => None,
            NodeBody::Matcher(matcher) => Some(ResolvedFields::Matcher {
                files: matcher.resolved_files.clone(),
            }),
            NodeBody::Document(document) => Some(ResolvedFields::Document {
                exists: document.exists,
                variables_in_doc: document.variables_in_doc.clone(),
            }),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            ResolvedFields::Matcher { .. } => NodeKind::MatcherLeaf,
            ResolvedFields::Document { .. } => NodeKind::DocumentLeaf,
        }
    }
}

impl VolatileField {
    pub fn name(&self) -> &'static str {
        match self {
            VolatileField::Stale => "needs_update",
            VolatileField::ResolvedFiles => "files",
            VolatileField::Exists => "exists",
            VolatileField::VariablesInDoc => "variables_in_doc",
            VolatileField::VariableIds => "variables[].id",
        }
    }

    /// Reset the field on `node` (not its children) to a canonical value
    pub fn erase(&self, node: &mut Node) {
        match (self, &mut node.body) {
            (VolatileField::Stale, _) => node.stale = false,
            (VolatileField::ResolvedFiles, NodeBody::Matcher(matcher)) => {
                matcher.resolved_files.clear()
            }
            (VolatileField::Exists, NodeBody::Document(document)) => document.exists = false,
            (VolatileField::VariablesInDoc, NodeBody::Document(document)) => {
                document.variables_in_doc.clear()
            }
            (VolatileField::VariableIds, NodeBody::Document(document)) => {
                for variable in &mut document.variables {
                    variable.id.clear();
                }
            }
            _ => {}
        }
    }

    /// Copy the field from a resolver response into `patch`
    pub fn absorb(&self, node: &Node, resolved: &ResolvedFields, patch: &mut NodePatch) {
        match (self, resolved) {
            (VolatileField::Stale, _) => patch.stale = Some(false),
            (VolatileField::ResolvedFiles, ResolvedFields::Matcher { files }) => {
                patch.resolved_files = Some(files.clone());
            }
            (VolatileField::Exists, ResolvedFields::Document { exists, .. }) => {
                patch.exists = Some(*exists);
            }
            (
                VolatileField::VariablesInDoc,
                ResolvedFields::Document {
                    exists,
                    variables_in_doc,
                },
            ) => {
                patch.variables_in_doc = Some(variables_in_doc.clone());
                // Bindings of a document that cannot be read are kept as they are
                if *exists {
                    if let Some(document) = node.document() {
                        let reconciled = reconcile_variables(&document.variables, variables_in_doc);
                        if reconciled != document.variables {
                            patch.variables = Some(reconciled);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Erase every volatile field of `node` itself
pub fn erase_volatile(node: &mut Node) {
    for field in volatile_fields(node.kind()) {
        field.erase(node);
    }
}

/// Erase derived data across the whole subtree before saving. Synthetic
/// binding ids are kept so a reloaded template stays addressable.
pub fn strip_volatile(node: &mut Node) {
    for field in volatile_fields(node.kind()) {
        if *field != VolatileField::VariableIds {
            field.erase(node);
        }
    }
    if let Some(children) = node.children_mut() {
        for child in children {
            strip_volatile(child);
        }
    }
}

/// Build the merge-back patch for a resolver response.
///
/// Fails with `InvalidStructure` when the response is for another kind of
/// node than `node`.
pub fn patch_from_resolved(node: &Node, resolved: &ResolvedFields) -> Result<NodePatch, TemplateError> {
    if node.kind() != resolved.kind() {
        return Err(TemplateError::InvalidStructure(format!(
            "resolver answered for a {} but node {} is a {}",
            resolved.kind(),
            node.id,
            node.kind()
        )));
    }

    let mut patch = NodePatch::default();
    for field in volatile_fields(node.kind()) {
        field.absorb(node, resolved, &mut patch);
    }
    Ok(patch)
}

/// Align a document's bindings with the variables found in it: existing keys
/// keep their value and position, new keys are appended as empty constants,
/// keys no longer in the document are dropped.
pub fn reconcile_variables(existing: &[TemplateVariable], found: &[String]) -> Vec<TemplateVariable> {
    let mut reconciled: Vec<TemplateVariable> = existing
        .iter()
        .filter(|variable| found.contains(&variable.key))
        .cloned()
        .collect();

    for key in found {
        if !reconciled.iter().any(|variable| &variable.key == key) {
            reconciled.push(TemplateVariable::constant(key.clone(), ""));
        }
    }
    reconciled
}
