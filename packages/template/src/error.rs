//! Error types for template trees

use crate::path::TreePath;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Path not found: {0}")]
    PathNotFound(TreePath),

    #[error("The root section cannot be deleted")]
    RootNotDeletable,

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    /// True when the error only means an edit target vanished under a
    /// concurrent structural change.
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, TemplateError::PathNotFound(_))
    }
}
