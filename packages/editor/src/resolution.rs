//! # Resolution Engine
//!
//! Re-resolves stale leaves concurrently and merges the results back into
//! the document without ever blocking edits.
//!
//! ## Node states
//!
//! ```text
//!          mark stale            dispatch             merge
//!  Clean ─────────────→ Stale ─────────────→ Resolving ─────→ Clean
//!                         ↑                      │
//!                         └──── marked again ────┘
//! ```
//!
//! Each stale leaf gets one resolver task on a [`JoinSet`]. The task carries
//! the stale epoch the node had at dispatch. When it completes, the merge
//! looks the node up by id and only writes if the node is still there and
//! still at that epoch. A result for a deleted node is dropped
//! ([`MergeOutcome::Vanished`]); one for a node re-marked since dispatch is
//! dropped and the node is dispatched again ([`MergeOutcome::Superseded`]).
//!
//! Sections never call the resolver. A stale section is cleared once no
//! leaf in its subtree is stale.

use crate::resolver::{ResolutionFailure, ResolveRequest, Resolver};
use crate::{Mutation, TemplateDocument};
use binder_template::{
    effective_directories, find_path, patch_from_resolved, resolve_path, walk, NodeId,
    ResolvedFields, TreePath,
};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default per-call resolver timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on concurrent resolver calls
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionConfig {
    pub timeout: Duration,
    pub max_in_flight: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// A finished resolver call
#[derive(Debug, Clone)]
pub struct Completion {
    pub node_id: NodeId,
    /// Stale epoch of the node when the call was dispatched
    pub epoch: u64,
    pub result: Result<ResolvedFields, ResolutionFailure>,
}

/// What merging a completion did to the document
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Applied { node_id: NodeId, path: TreePath },
    /// Node no longer in the tree
    Vanished { node_id: NodeId },
    /// Node was marked stale again (or edited clean) after dispatch
    Superseded { node_id: NodeId },
    Failed {
        node_id: NodeId,
        failure: ResolutionFailure,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Clean,
    Stale,
    Resolving,
}

/// Tally of a [`ResolutionEngine::run_until_idle`] pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionReport {
    pub applied: usize,
    pub vanished: usize,
    pub superseded: usize,
    pub failures: Vec<(NodeId, ResolutionFailure)>,
}

impl ResolutionReport {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Applied { .. } => self.applied += 1,
            MergeOutcome::Vanished { .. } => self.vanished += 1,
            MergeOutcome::Superseded { .. } => self.superseded += 1,
            MergeOutcome::Failed { node_id, failure } => self.failures.push((node_id, failure)),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

pub struct ResolutionEngine {
    resolver: Arc<dyn Resolver>,
    config: ResolutionConfig,
    tasks: JoinSet<Completion>,
    /// Dispatch epoch per node with a call in flight
    in_flight: HashMap<NodeId, u64>,
    /// Epoch at which a node's last call failed; not retried until re-marked
    failed: HashMap<NodeId, u64>,
}

impl ResolutionEngine {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self::with_config(resolver, ResolutionConfig::default())
    }

    /// `max_in_flight` is raised to at least 1
    pub fn with_config(resolver: Arc<dyn Resolver>, config: ResolutionConfig) -> Self {
        let config = ResolutionConfig {
            max_in_flight: config.max_in_flight.max(1),
            ..config
        };
        Self {
            resolver,
            config,
            tasks: JoinSet::new(),
            in_flight: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Where `id` is in its resolution cycle, `None` if it is not in the tree
    pub fn state_of(&self, doc: &TemplateDocument, id: &str) -> Option<NodeState> {
        let path = find_path(doc.tree(), id)?;
        let node = resolve_path(doc.tree(), &path).ok()?;

        match self.in_flight.get(id) {
            Some(epoch) if node.stale && *epoch == doc.stale_epoch(id) => {
                Some(NodeState::Resolving)
            }
            _ if node.stale => Some(NodeState::Stale),
            _ => Some(NodeState::Clean),
        }
    }

    /// Start resolver calls for stale leaves that need one, then clear
    /// sections with nothing left to wait for. Returns the number of calls
    /// started.
    pub fn dispatch(&mut self, doc: &mut TemplateDocument) -> usize {
        let tree = doc.tree();
        let directories = effective_directories(tree);
        self.failed.retain(|id, _| directories.contains_key(id));
        let capacity = self.config.max_in_flight.saturating_sub(self.in_flight.len());

        let mut requests = Vec::new();
        for (_, node) in walk(tree) {
            if requests.len() >= capacity {
                break;
            }
            if node.is_section() || !node.stale || self.in_flight.contains_key(&node.id) {
                continue;
            }

            let epoch = doc.stale_epoch(&node.id);
            if self.failed.get(&node.id) == Some(&epoch) {
                continue;
            }

            let directory = directories.get(&node.id).cloned().unwrap_or_default();
            if let Some(request) = ResolveRequest::for_node(node, directory) {
                requests.push((request, epoch));
            }
        }

        let started = requests.len();
        for (request, epoch) in requests {
            self.spawn(request, epoch);
        }

        doc.settle_sections();
        started
    }

    fn spawn(&mut self, request: ResolveRequest, epoch: u64) {
        let resolver = Arc::clone(&self.resolver);
        let timeout = self.config.timeout;
        let node_id = request.node_id.clone();

        debug!(
            node_id = %node_id,
            kind = %request.kind,
            directory = %request.effective_directory,
            epoch,
            "dispatching resolver call"
        );
        self.in_flight.insert(node_id.clone(), epoch);

        self.tasks.spawn(async move {
            let call = AssertUnwindSafe(resolver.resolve(request)).catch_unwind();
            let result = match tokio::time::timeout(timeout, call).await {
                Err(_) => Err(ResolutionFailure::Timeout(timeout)),
                Ok(Err(panic)) => Err(ResolutionFailure::Panicked(panic_message(panic.as_ref()))),
                Ok(Ok(result)) => result,
            };

            Completion {
                node_id,
                epoch,
                result,
            }
        });
    }

    /// Wait for the next resolver call to finish. `None` when nothing is in
    /// flight.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        loop {
            match self.tasks.join_next().await? {
                Ok(completion) => return Some(completion),
                Err(err) => error!(error = %err, "resolver task did not complete"),
            }
        }
    }

    /// Fold a completed call into the document
    pub fn merge(&mut self, doc: &mut TemplateDocument, completion: Completion) -> MergeOutcome {
        let Completion {
            node_id,
            epoch,
            result,
        } = completion;
        self.in_flight.remove(&node_id);

        let Some(path) = find_path(doc.tree(), &node_id) else {
            self.failed.remove(&node_id);
            debug!(node_id = %node_id, "dropping result for removed node");
            return MergeOutcome::Vanished { node_id };
        };

        let still_wanted = doc.stale_epoch(&node_id) == epoch
            && resolve_path(doc.tree(), &path).is_ok_and(|node| node.stale);
        if !still_wanted {
            debug!(node_id = %node_id, epoch, "dropping superseded result");
            return MergeOutcome::Superseded { node_id };
        }

        let fields = match result {
            Ok(fields) => fields,
            Err(failure) => return self.fail(node_id, epoch, failure),
        };

        let patch = match resolve_path(doc.tree(), &path)
            .and_then(|node| patch_from_resolved(node, &fields))
        {
            Ok(patch) => patch,
            Err(err) => {
                return self.fail(node_id, epoch, ResolutionFailure::Malformed(err.to_string()))
            }
        };

        if let Err(err) = doc.apply(Mutation::UpdateNode {
            path: path.clone(),
            patch,
        }) {
            return self.fail(node_id, epoch, ResolutionFailure::Malformed(err.to_string()));
        }

        self.failed.remove(&node_id);
        doc.settle_sections();
        debug!(node_id = %node_id, path = %path, "merged resolution");
        MergeOutcome::Applied { node_id, path }
    }

    fn fail(&mut self, node_id: NodeId, epoch: u64, failure: ResolutionFailure) -> MergeOutcome {
        warn!(node_id = %node_id, error = %failure, "resolution failed");
        self.failed.insert(node_id.clone(), epoch);
        MergeOutcome::Failed { node_id, failure }
    }

    /// Dispatch and merge until nothing is in flight and nothing more can be
    /// dispatched
    pub async fn run_until_idle(&mut self, doc: &mut TemplateDocument) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        loop {
            self.dispatch(doc);
            let Some(completion) = self.next_completion().await else {
                break;
            };
            report.record(self.merge(doc, completion));
        }

        info!(
            applied = report.applied,
            failed = report.failed(),
            superseded = report.superseded,
            vanished = report.vanished,
            "resolution idle"
        );
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
