//! # Template Node Model
//!
//! A report template is a rooted tree. Internal nodes are [`Section`]s that
//! scope a base directory and order their children; leaves either match
//! files on disk ([`MatcherLeaf`]) or reference a single templated document
//! ([`DocumentLeaf`]).
//!
//! ```text
//! Section (root, absolute base directory)
//!   ├── MatcherLeaf   "A PDF in ./ containing COA"
//!   ├── DocumentLeaf  "cover.docx"
//!   └── Section       base "Raw Data"
//!         └── MatcherLeaf ...
//! ```
//!
//! Fields filled in by the resolver (`files`, `exists`, `variables_in_doc`)
//! and the transient `stale` flag are derived data. Which fields those are
//! is recorded once, in [`crate::schema`].
//!
//! The serialized shape keeps the field names of existing template files:
//! a `type` tag of `Section`, `FileType` or `DocxTemplate`, snake_case keys,
//! and `needs_update` for the stale flag.

use crate::error::TemplateError;
use crate::id_generator::{new_id, IdGenerator};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

pub type NodeId = String;

/// Label given to the root of a brand-new template
pub const DEFAULT_ROOT_BOOKMARK: &str = "Quality Control Report";

/// Variant tag of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Section,
    MatcherLeaf,
    DocumentLeaf,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Section => "Section",
            NodeKind::MatcherLeaf => "FileType",
            NodeKind::DocumentLeaf => "DocxTemplate",
        };
        f.write_str(name)
    }
}

/// A node of the template tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default = "new_id")]
    pub id: NodeId,

    #[serde(default)]
    pub bookmark_name: Option<String>,

    /// Derived fields cannot be trusted until the node is re-resolved
    #[serde(rename = "needs_update", default, skip_serializing_if = "is_false")]
    pub stale: bool,

    #[serde(flatten)]
    pub body: NodeBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeBody {
    Section(Section),

    #[serde(rename = "FileType", alias = "MatcherLeaf")]
    Matcher(MatcherLeaf),

    #[serde(rename = "DocxTemplate", alias = "DocumentLeaf")]
    Document(DocumentLeaf),
}

/// Directory-scoped grouping with ordered children
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    /// Relative to the parent section's resolved directory; absolute on the root
    #[serde(default, deserialize_with = "null_as_default")]
    pub base_directory: String,

    /// Empty means the section is always included
    #[serde(default)]
    pub method_codes: Vec<String>,

    /// Output order
    #[serde(default)]
    pub children: Vec<Node>,

    /// Bindings older editors kept on the section for all of its documents.
    /// Read but never written; [`crate::from_json`] moves them onto the
    /// section's DocumentLeaf children.
    #[serde(rename = "variables", default, skip_serializing)]
    pub legacy_variables: Vec<TemplateVariable>,
}

/// File-selection rule resolved against a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherLeaf {
    /// Relative to the enclosing section's directory
    #[serde(default = "current_dir")]
    pub directory_source: String,

    #[serde(rename = "filename_text_to_match", alias = "match_expression", default)]
    pub match_expression: String,

    #[serde(rename = "will_have_page_numbers", default = "default_true")]
    pub page_numbering: bool,

    #[serde(default)]
    pub bookmark_rules: Vec<BookmarkRule>,

    #[serde(default)]
    pub reorder_pages_metals: bool,

    #[serde(default)]
    pub reorder_pages_datetime: bool,

    #[serde(default = "default_true")]
    pub keep_existing_bookmarks: bool,

    #[serde(rename = "files", default)]
    pub resolved_files: Vec<ResolvedFile>,
}

/// Page-level bookmark rule. Opaque to the editor; interpreted at build time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookmarkRule {
    #[serde(default)]
    pub bookmark_name: String,
    #[serde(default)]
    pub rule: String,
}

/// A file the resolver matched for a [`MatcherLeaf`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFile {
    #[serde(default = "new_id")]
    pub id: String,

    #[serde(rename = "file_path")]
    pub path: String,

    #[serde(rename = "num_pages", default)]
    pub page_count: Option<u32>,

    #[serde(default)]
    pub bookmark_name: Option<String>,
}

impl ResolvedFile {
    pub fn new(path: impl Into<String>, page_count: Option<u32>) -> Self {
        Self {
            id: new_id(),
            path: path.into(),
            page_count,
            bookmark_name: None,
        }
    }

    /// Bookmark label derived from the file name: extension dropped and
    /// separators turned into spaces.
    pub fn filename_bookmark(&self) -> String {
        let normalized = self.path.replace('\\', "/");
        let basename = normalized.rsplit('/').next().unwrap_or(&normalized);
        basename
            .replace(".pdf", "")
            .replace(".PDF", "")
            .replace(['-', '.', '_'], " ")
    }
}

/// Single templated document artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLeaf {
    #[serde(rename = "docx_path", alias = "document_path", default)]
    pub document_path: String,

    #[serde(rename = "will_have_page_numbers", default = "default_true")]
    pub page_numbering: bool,

    /// Template variable bindings, in display order
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,

    #[serde(flatten)]
    pub toc: TocColumns,

    #[serde(default)]
    pub exists: bool,

    /// Variables found inside the document by the resolver
    #[serde(default)]
    pub variables_in_doc: Vec<String>,
}

/// `{key, value}` binding for a template variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVariable {
    /// Synthetic id for list rendering
    #[serde(default = "new_id")]
    pub id: String,

    #[serde(rename = "template_text", alias = "key")]
    pub key: String,

    #[serde(rename = "constant_value", alias = "value", default, deserialize_with = "null_as_default")]
    pub value: String,

    /// When false the variable is filled with a page number instead of `value`
    #[serde(default = "default_true")]
    pub is_constant: bool,

    #[serde(default)]
    pub bookmark_for_page_number: Option<String>,

    #[serde(default = "default_true")]
    pub use_beginning_of_bookmark: bool,
}

impl TemplateVariable {
    pub fn constant(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            key: key.into(),
            value: value.into(),
            is_constant: true,
            bookmark_for_page_number: None,
            use_beginning_of_bookmark: true,
        }
    }
}

/// Table-of-contents column bindings of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocColumns {
    #[serde(default)]
    pub is_table_of_contents: bool,

    /// Zero-based column holding the start page
    #[serde(default = "default_page_start_col")]
    pub page_start_col: u32,

    #[serde(default)]
    pub page_end_col: Option<u32>,

    /// Pages prepended to the built document
    #[serde(default = "default_page_number_offset")]
    pub page_number_offset: Option<i32>,
}

impl Default for TocColumns {
    fn default() -> Self {
        Self {
            is_table_of_contents: false,
            page_start_col: default_page_start_col(),
            page_end_col: None,
            page_number_offset: default_page_number_offset(),
        }
    }
}

impl Node {
    /// Fresh root section for a new template
    pub fn empty_root() -> Self {
        Self {
            id: new_id(),
            bookmark_name: Some(DEFAULT_ROOT_BOOKMARK.to_string()),
            stale: false,
            body: NodeBody::Section(Section::default()),
        }
    }

    /// Default node of the given kind with a fresh id
    pub fn new_default(kind: NodeKind, ids: &mut IdGenerator) -> Self {
        let body = match kind {
            NodeKind::Section => NodeBody::Section(Section {
                base_directory: "./".to_string(),
                method_codes: Vec::new(),
                children: Vec::new(),
                legacy_variables: Vec::new(),
            }),
            NodeKind::MatcherLeaf => NodeBody::Matcher(MatcherLeaf {
                directory_source: current_dir(),
                match_expression: String::new(),
                page_numbering: true,
                bookmark_rules: Vec::new(),
                reorder_pages_metals: false,
                reorder_pages_datetime: false,
                keep_existing_bookmarks: true,
                resolved_files: Vec::new(),
            }),
            NodeKind::DocumentLeaf => NodeBody::Document(DocumentLeaf {
                document_path: String::new(),
                page_numbering: false,
                variables: Vec::new(),
                toc: TocColumns::default(),
                exists: false,
                variables_in_doc: Vec::new(),
            }),
        };

        Self {
            id: ids.new_id(),
            bookmark_name: None,
            stale: false,
            body,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.body {
            NodeBody::Section(_) => NodeKind::Section,
            NodeBody::Matcher(_) => NodeKind::MatcherLeaf,
            NodeBody::Document(_) => NodeKind::DocumentLeaf,
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self.body, NodeBody::Section(_))
    }

    pub fn section(&self) -> Option<&Section> {
        match &self.body {
            NodeBody::Section(section) => Some(section),
            _ => None,
        }
    }

    pub fn section_mut(&mut self) -> Option<&mut Section> {
        match &mut self.body {
            NodeBody::Section(section) => Some(section),
            _ => None,
        }
    }

    pub fn matcher(&self) -> Option<&MatcherLeaf> {
        match &self.body {
            NodeBody::Matcher(matcher) => Some(matcher),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&DocumentLeaf> {
        match &self.body {
            NodeBody::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&[Node]> {
        self.section().map(|s| s.children.as_slice())
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.section_mut().map(|s| &mut s.children)
    }

    /// Insert a child at `index` (append when `None`, clamped to the end)
    pub fn add_child(&mut self, child: Node, index: Option<usize>) -> Result<(), TemplateError> {
        let kind = self.kind();
        let children = self.children_mut().ok_or_else(|| {
            TemplateError::InvalidStructure(format!("{} nodes cannot have children", kind))
        })?;
        let at = index.unwrap_or(children.len()).min(children.len());
        children.insert(at, child);
        Ok(())
    }

    /// Whether the resolver found what this leaf refers to. `None` for sections.
    pub fn exists(&self) -> Option<bool> {
        match &self.body {
            NodeBody::Section(_) => None,
            NodeBody::Matcher(matcher) => Some(matcher.exists()),
            NodeBody::Document(document) => Some(document.exists),
        }
    }

    /// Mark this node and every descendant stale, collecting their ids
    pub fn mark_stale(&mut self, marked: &mut Vec<NodeId>) {
        self.stale = true;
        marked.push(self.id.clone());
        if let Some(children) = self.children_mut() {
            for child in children {
                child.mark_stale(marked);
            }
        }
    }

    /// Ids of this node and all descendants, pre-order
    pub fn collect_ids(&self, ids: &mut Vec<NodeId>) {
        ids.push(self.id.clone());
        for child in self.children().unwrap_or_default() {
            child.collect_ids(ids);
        }
    }

    /// True if this node or any descendant leaf is stale
    pub fn has_stale_leaf(&self) -> bool {
        match self.children() {
            Some(children) => children.iter().any(Node::has_stale_leaf),
            None => self.stale,
        }
    }
}

impl MatcherLeaf {
    pub fn exists(&self) -> bool {
        !self.resolved_files.is_empty()
    }
}

/// Check the invariants a whole tree must satisfy: a Section root without
/// method codes, and ids unique across the tree.
pub fn validate_tree(root: &Node) -> Result<(), TemplateError> {
    let section = root.section().ok_or_else(|| {
        TemplateError::InvalidStructure(format!("root must be a Section, found {}", root.kind()))
    })?;

    if !section.method_codes.is_empty() {
        return Err(TemplateError::InvalidStructure(
            "the root section cannot carry method codes".to_string(),
        ));
    }

    let mut ids = Vec::new();
    root.collect_ids(&mut ids);
    check_unique_ids(ids.iter(), &HashSet::new())
}

/// Fail with `DuplicateId` if `ids` repeats or overlaps `existing`
pub fn check_unique_ids<'a>(
    ids: impl Iterator<Item = &'a NodeId>,
    existing: &HashSet<&NodeId>,
) -> Result<(), TemplateError> {
    let mut seen: HashSet<&NodeId> = HashSet::new();
    for id in ids {
        if existing.contains(id) || !seen.insert(id) {
            return Err(TemplateError::DuplicateId(id.clone()));
        }
    }
    Ok(())
}

/// Build a fresh default node with a random id
pub fn create_default_node(kind: NodeKind) -> Node {
    Node::new_default(kind, &mut IdGenerator::new())
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_true() -> bool {
    true
}

fn current_dir() -> String {
    "./".to_string()
}

fn default_page_start_col() -> u32 {
    3
}

fn default_page_number_offset() -> Option<i32> {
    Some(0)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
