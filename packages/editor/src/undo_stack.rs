//! # Undo/Redo Stack
//!
//! Tracks edit history on a [`TemplateDocument`].
//!
//! ## Design
//!
//! - Trees are immutable values, so each history entry simply keeps the
//!   tree as it was before its mutations
//! - Undo restores that tree and moves the entry to the redo stack; the
//!   saved snapshot is left alone, so undoing back to it clears the unsaved
//!   flag
//! - Redo re-applies the original mutations to the current tree
//! - New mutations clear the redo stack
//! - Supports batched operations (group multiple mutations as one undo step)
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let mut doc = TemplateDocument::load_json(&source)?;
//!
//! stack.apply(Mutation::DeleteNode { path: vec![0].into() }, &mut doc)?;
//! stack.undo(&mut doc)?;
//! stack.redo(&mut doc)?;
//! ```

use crate::{EditorError, Mutation, MutationResult, TemplateDocument};
use binder_template::Node;

/// A group of mutations that should be undone/redone together
#[derive(Debug, Clone)]
pub struct MutationBatch {
    /// The mutations in this batch (in application order)
    pub mutations: Vec<Mutation>,

    /// Tree before the first mutation of the batch
    pub before: Node,

    /// Optional description of this batch
    pub description: Option<String>,
}

impl MutationBatch {
    /// Create a single-mutation batch
    pub fn single(mutation: Mutation, before: Node) -> Self {
        Self {
            mutations: vec![mutation],
            before,
            description: None,
        }
    }

    /// Add a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Undo/redo stack for template editing
#[derive(Debug)]
pub struct UndoStack {
    /// Stack of applied batches (most recent last)
    undo_stack: Vec<MutationBatch>,

    /// Stack of undone batches (most recent last)
    redo_stack: Vec<MutationBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    current_batch: Option<MutationBatch>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Apply a mutation and record it for undo
    pub fn apply(
        &mut self,
        mutation: Mutation,
        doc: &mut TemplateDocument,
    ) -> Result<MutationResult, EditorError> {
        let before = doc.tree().clone();
        let result = doc.apply(mutation.clone())?;

        if let Some(batch) = &mut self.current_batch {
            batch.mutations.push(mutation);
        } else {
            self.push_batch(MutationBatch::single(mutation, before));
        }

        Ok(result)
    }

    /// Start a batch of mutations (will be undone/redone together)
    pub fn begin_batch(&mut self, doc: &TemplateDocument) {
        self.current_batch = Some(MutationBatch {
            mutations: Vec::new(),
            before: doc.tree().clone(),
            description: None,
        });
    }

    /// End the current batch and push to undo stack
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.mutations.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    /// Push a batch to the undo stack
    fn push_batch(&mut self, batch: MutationBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the redo history
        self.redo_stack.clear();
    }

    /// Undo the most recent mutation/batch
    pub fn undo(&mut self, doc: &mut TemplateDocument) -> Result<bool, EditorError> {
        let Some(mut batch) = self.undo_stack.pop() else {
            return Ok(false);
        };

        let current = doc.tree().clone();
        doc.restore(std::mem::replace(&mut batch.before, current));
        self.redo_stack.push(batch);
        Ok(true)
    }

    /// Redo the most recently undone mutation/batch
    pub fn redo(&mut self, doc: &mut TemplateDocument) -> Result<bool, EditorError> {
        let Some(mut batch) = self.redo_stack.pop() else {
            return Ok(false);
        };

        let before = doc.tree().clone();
        for mutation in &batch.mutations {
            if let Err(err) = doc.apply(mutation.clone()) {
                // Leave the document as it was before the redo attempt
                doc.restore(before);
                self.redo_stack.push(batch);
                return Err(err);
            }
        }

        batch.before = before;
        self.undo_stack.push(batch);
        Ok(true)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
