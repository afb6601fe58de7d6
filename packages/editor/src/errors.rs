//! Error types for the editor

use binder_template::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),
}

impl EditorError {
    /// True when the edit addressed a node that does not exist
    pub fn is_path_not_found(&self) -> bool {
        match self {
            EditorError::Template(err) => err.is_path_not_found(),
            EditorError::Mutation(err) => err.is_path_not_found(),
            EditorError::Io(_) => false,
        }
    }
}
