//! Partial node updates.
//!
//! A [`NodePatch`] carries the fields an edit wants to overwrite; absent
//! fields are left alone. The id is deliberately not patchable, so a merge
//! always preserves node identity.

use crate::error::TemplateError;
use crate::model::{BookmarkRule, Node, NodeBody, NodeKind, ResolvedFile, TemplateVariable, TocColumns};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    /// `Some(None)` clears the bookmark
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub bookmark_name: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,

    // Section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_codes: Option<Vec<String>>,

    // MatcherLeaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_rules: Option<Vec<BookmarkRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_pages_metals: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_pages_datetime: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_existing_bookmarks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_files: Option<Vec<ResolvedFile>>,

    // MatcherLeaf and DocumentLeaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_numbering: Option<bool>,

    // DocumentLeaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<TemplateVariable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toc: Option<TocColumns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_in_doc: Option<Vec<String>>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        *self == NodePatch::default()
    }

    pub fn bookmark(name: Option<String>) -> Self {
        Self {
            bookmark_name: Some(name),
            ..Default::default()
        }
    }

    pub fn base_directory(dir: impl Into<String>) -> Self {
        Self {
            base_directory: Some(dir.into()),
            ..Default::default()
        }
    }

    pub fn stale(stale: bool) -> Self {
        Self {
            stale: Some(stale),
            ..Default::default()
        }
    }

    /// Shallow-merge this patch into `node`.
    ///
    /// Fields that do not exist on the node's kind are rejected with
    /// `InvalidStructure`; nothing is written in that case.
    pub fn apply_to(&self, node: &mut Node) -> Result<(), TemplateError> {
        self.check_kind(node.kind())?;

        if let Some(name) = &self.bookmark_name {
            node.bookmark_name = name.clone();
        }
        if let Some(stale) = self.stale {
            node.stale = stale;
        }

        match &mut node.body {
            NodeBody::Section(section) => {
                if let Some(dir) = &self.base_directory {
                    section.base_directory = dir.clone();
                }
                if let Some(codes) = &self.method_codes {
                    section.method_codes = dedup_codes(codes);
                }
            }
            NodeBody::Matcher(matcher) => {
                if let Some(dir) = &self.directory_source {
                    matcher.directory_source = dir.clone();
                }
                if let Some(expr) = &self.match_expression {
                    matcher.match_expression = expr.clone();
                }
                if let Some(rules) = &self.bookmark_rules {
                    matcher.bookmark_rules = rules.clone();
                }
                if let Some(flag) = self.reorder_pages_metals {
                    matcher.reorder_pages_metals = flag;
                }
                if let Some(flag) = self.reorder_pages_datetime {
                    matcher.reorder_pages_datetime = flag;
                }
                if let Some(flag) = self.keep_existing_bookmarks {
                    matcher.keep_existing_bookmarks = flag;
                }
                if let Some(files) = &self.resolved_files {
                    matcher.resolved_files = files.clone();
                }
                if let Some(flag) = self.page_numbering {
                    matcher.page_numbering = flag;
                }
            }
            NodeBody::Document(document) => {
                if let Some(path) = &self.document_path {
                    document.document_path = path.clone();
                }
                if let Some(variables) = &self.variables {
                    document.variables = variables.clone();
                }
                if let Some(toc) = &self.toc {
                    document.toc = toc.clone();
                }
                if let Some(exists) = self.exists {
                    document.exists = exists;
                }
                if let Some(found) = &self.variables_in_doc {
                    document.variables_in_doc = found.clone();
                }
                if let Some(flag) = self.page_numbering {
                    document.page_numbering = flag;
                }
            }
        }

        Ok(())
    }

    fn check_kind(&self, kind: NodeKind) -> Result<(), TemplateError> {
        let foreign = match kind {
            NodeKind::Section => self
                .first_set(&[
                    ("directory_source", self.directory_source.is_some()),
                    ("match_expression", self.match_expression.is_some()),
                    ("bookmark_rules", self.bookmark_rules.is_some()),
                    ("reorder_pages_metals", self.reorder_pages_metals.is_some()),
                    ("reorder_pages_datetime", self.reorder_pages_datetime.is_some()),
                    ("keep_existing_bookmarks", self.keep_existing_bookmarks.is_some()),
                    ("resolved_files", self.resolved_files.is_some()),
                    ("page_numbering", self.page_numbering.is_some()),
                ])
                .or_else(|| self.document_field()),
            NodeKind::MatcherLeaf => self.section_field().or_else(|| self.document_field()),
            NodeKind::DocumentLeaf => self.section_field().or_else(|| {
                self.first_set(&[
                    ("directory_source", self.directory_source.is_some()),
                    ("match_expression", self.match_expression.is_some()),
                    ("bookmark_rules", self.bookmark_rules.is_some()),
                    ("reorder_pages_metals", self.reorder_pages_metals.is_some()),
                    ("reorder_pages_datetime", self.reorder_pages_datetime.is_some()),
                    ("keep_existing_bookmarks", self.keep_existing_bookmarks.is_some()),
                    ("resolved_files", self.resolved_files.is_some()),
                ])
            }),
        };

        match foreign {
            Some(field) => Err(TemplateError::InvalidStructure(format!(
                "field `{}` does not apply to {} nodes",
                field, kind
            ))),
            None => Ok(()),
        }
    }

    fn section_field(&self) -> Option<&'static str> {
        self.first_set(&[
            ("base_directory", self.base_directory.is_some()),
            ("method_codes", self.method_codes.is_some()),
        ])
    }

    fn document_field(&self) -> Option<&'static str> {
        self.first_set(&[
            ("document_path", self.document_path.is_some()),
            ("variables", self.variables.is_some()),
            ("toc", self.toc.is_some()),
            ("exists", self.exists.is_some()),
            ("variables_in_doc", self.variables_in_doc.is_some()),
        ])
    }

    fn first_set(&self, fields: &[(&'static str, bool)]) -> Option<&'static str> {
        fields.iter().find(|(_, set)| *set).map(|(name, _)| *name)
    }
}

/// Method codes are a set; keep first occurrences in order
fn dedup_codes(codes: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        if !unique.contains(code) {
            unique.push(code.clone());
        }
    }
    unique
}

/// Distinguish an explicit `null` from an absent field
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
