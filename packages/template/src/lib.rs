//! # Binder Template
//!
//! The report-template tree and the pure operations on it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ template: tree values (this crate)          │
//! │  - Node model (Section / FileType / Docx)   │
//! │  - Path addressing, copy-on-write updates   │
//! │  - Volatile-field schema                    │
//! │  - Equality / diff, persistence codec       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: mutations, unsaved tracking,        │
//! │         asynchronous re-resolution          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate performs I/O or interprets matching rules.

pub mod equality;
pub mod error;
pub mod filter;
pub mod id_generator;
pub mod model;
pub mod patch;
pub mod path;
pub mod schema;
pub mod serializer;

pub use equality::{differences, equivalent, Difference};
pub use error::TemplateError;
pub use filter::filter_by_method_codes;
pub use id_generator::IdGenerator;
pub use model::{
    create_default_node, validate_tree, BookmarkRule, DocumentLeaf, MatcherLeaf, Node, NodeBody,
    NodeId, NodeKind, ResolvedFile, Section, TemplateVariable, TocColumns,
};
pub use patch::NodePatch;
pub use path::{
    compose_directory, effective_directories, find_path, resolve_path, update_at, walk, TreePath,
};
pub use schema::{patch_from_resolved, volatile_fields, ResolvedFields, VolatileField};
pub use serializer::{from_json, to_json};
