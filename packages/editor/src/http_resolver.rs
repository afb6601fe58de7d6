//! HTTP client for the resolver service.
//!
//! The service exposes one endpoint per leaf kind. Each takes the leaf as
//! JSON and its enclosing directory as the `parent_directory_source` query
//! parameter, and answers with the same leaf with its derived fields filled
//! in.

use crate::resolver::{ResolutionFailure, ResolveRequest, Resolver};
use async_trait::async_trait;
use binder_template::{Node, NodeKind, ResolvedFields};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint resolving nodes of `kind`
    pub fn endpoint(&self, kind: NodeKind) -> Option<String> {
        let route = match kind {
            NodeKind::Section => return None,
            NodeKind::MatcherLeaf => "filetype",
            NodeKind::DocumentLeaf => "docxtemplate",
        };
        Some(format!("{}/{}", self.base_url.trim_end_matches('/'), route))
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, request: ResolveRequest) -> Result<ResolvedFields, ResolutionFailure> {
        let url = self.endpoint(request.kind).ok_or_else(|| {
            ResolutionFailure::Malformed(format!("{} nodes are not resolved", request.kind))
        })?;

        debug!(url = %url, node_id = %request.node_id, "POST resolver");
        let response = self
            .client
            .post(&url)
            .query(&[("parent_directory_source", request.effective_directory.as_str())])
            .json(&request.snapshot)
            .send()
            .await
            .map_err(|err| ResolutionFailure::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ResolutionFailure::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let node: Node = response
            .json()
            .await
            .map_err(|err| ResolutionFailure::Malformed(err.to_string()))?;

        ResolvedFields::from_node(&node)
            .filter(|fields| fields.kind() == request.kind)
            .ok_or_else(|| {
                ResolutionFailure::Malformed(format!(
                    "expected a {} back, got a {}",
                    request.kind,
                    node.kind()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let resolver = HttpResolver::new("http://localhost:8000/");

        assert_eq!(
            resolver.endpoint(NodeKind::MatcherLeaf).as_deref(),
            Some("http://localhost:8000/filetype")
        );
        assert_eq!(
            resolver.endpoint(NodeKind::DocumentLeaf).as_deref(),
            Some("http://localhost:8000/docxtemplate")
        );
        assert_eq!(resolver.endpoint(NodeKind::Section), None);
    }
}
