//! # Binder Editor
//!
//! Editing and re-resolution engine for report templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ template: tree values, paths, equality      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: TemplateDocument + mutations        │
//! │  - Apply edits atomically, with effects     │
//! │  - Track unsaved changes against last save  │
//! │  - Undo / redo                              │
//! │  - Resolve stale leaves concurrently        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ resolver: any `Resolver` (HTTP service)     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One owner**: the document holds the only tree; everything else
//!    reads it or sends it mutations
//! 2. **Edits never wait**: resolution runs beside editing and its results
//!    are merged by node id when they arrive
//! 3. **Derived data is not a change**: resolved files, `exists` and the
//!    stale flag never mark the template unsaved. Only a merge that adds or
//!    drops a document's variable bindings does.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use binder_editor::{ResolutionEngine, TemplateDocument};
//!
//! let mut doc = TemplateDocument::load_json(&source)?;
//! let mut engine = ResolutionEngine::new(Arc::new(HttpResolver::new(url)));
//!
//! doc.apply(Mutation::UpdateNode {
//!     path: TreePath::root(),
//!     patch: NodePatch::base_directory("C:/Jobs/12"),
//! })?;
//!
//! let report = engine.run_until_idle(&mut doc).await;
//! ```

mod document;
mod errors;
mod mutations;
mod post_effects;
mod resolution;
mod resolver;
mod undo_stack;

#[cfg(feature = "http")]
mod http_resolver;

pub use document::TemplateDocument;
pub use errors::EditorError;
pub use mutations::{Mutation, MutationError, MutationResult};
pub use post_effects::{
    InvalidateOnBaseDirectoryChange, InvalidateOnRuleChange, PostEffect, PostEffectEngine,
};
pub use resolution::{
    Completion, MergeOutcome, NodeState, ResolutionConfig, ResolutionEngine, ResolutionReport,
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_TIMEOUT,
};
pub use resolver::{ResolutionFailure, ResolveRequest, ResolveTarget, Resolver};
pub use undo_stack::{MutationBatch, UndoStack};

#[cfg(feature = "http")]
pub use http_resolver::HttpResolver;

// Re-export common types for convenience
pub use binder_template::{Node, NodeKind, NodePatch, ResolvedFields, TreePath};
