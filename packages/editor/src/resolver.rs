//! Resolver boundary.
//!
//! A resolver turns a leaf's matching rule or document reference, plus the
//! directory it is evaluated in, into the leaf's derived fields. The engine
//! only ever talks to it through the [`Resolver`] trait; the HTTP client
//! behind the `http` feature is one implementation.

use async_trait::async_trait;
use binder_template::{Node, NodeBody, NodeId, NodeKind, ResolvedFields};
use std::time::Duration;
use thiserror::Error;

/// What a leaf asks the resolver to look up
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveTarget {
    Matcher {
        directory_source: String,
        match_expression: String,
    },
    Document {
        document_path: String,
    },
}

/// One resolver call for one leaf
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub node_id: NodeId,
    pub kind: NodeKind,
    pub target: ResolveTarget,
    /// Composed directory of the leaf's enclosing section
    pub effective_directory: String,
    /// The leaf as it was when the call was dispatched
    pub snapshot: Node,
}

impl ResolveRequest {
    /// Request for `node`, or `None` for sections
    pub fn for_node(node: &Node, effective_directory: impl Into<String>) -> Option<Self> {
        let target = match &node.body {
            NodeBody::Section(_) => return None,
            NodeBody::Matcher(matcher) => ResolveTarget::Matcher {
                directory_source: matcher.directory_source.clone(),
                match_expression: matcher.match_expression.clone(),
            },
            NodeBody::Document(document) => ResolveTarget::Document {
                document_path: document.document_path.clone(),
            },
        };

        Some(Self {
            node_id: node.id.clone(),
            kind: node.kind(),
            target,
            effective_directory: effective_directory.into(),
            snapshot: node.clone(),
        })
    }
}

/// Why a single resolution did not produce fields. Always local to the
/// node it was for.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionFailure {
    #[error("Resolver timed out after {0:?}")]
    Timeout(Duration),

    #[error("Resolver rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed resolver response: {0}")]
    Malformed(String),

    #[error("Resolver panicked: {0}")]
    Panicked(String),
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, request: ResolveRequest) -> Result<ResolvedFields, ResolutionFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use binder_template::create_default_node;

    #[test]
    fn test_sections_are_not_resolved() {
        let section = create_default_node(NodeKind::Section);
        assert!(ResolveRequest::for_node(&section, "B").is_none());
    }

    #[test]
    fn test_request_for_matcher() {
        let mut leaf = create_default_node(NodeKind::MatcherLeaf);
        if let NodeBody::Matcher(matcher) = &mut leaf.body {
            matcher.match_expression = "COA".to_string();
        }

        let request = ResolveRequest::for_node(&leaf, "Jobs/12").unwrap();

        assert_eq!(request.node_id, leaf.id);
        assert_eq!(request.effective_directory, "Jobs/12");
        assert_eq!(
            request.target,
            ResolveTarget::Matcher {
                directory_source: "./".to_string(),
                match_expression: "COA".to_string()
            }
        );
    }
}
