//! Cleanup agent
//!
//! Deletes inference resources left behind by failed deployments. Sweeping
//! is idempotent: a resource that is already gone counts as cleaned up, so a
//! second sweep over the same candidates deletes nothing.

use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::ResourceKind;
use pipewright_core::domain::status::{EndpointStatus, LifecycleStatus};
use pipewright_core::dto::ListQuery;
use pipewright_core::naming::ResourceNamer;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::scheduler::{CancelToken, PollError, PollPolicy, StatusPoller};

/// Endpoints inspected by [`CleanupAgent::discover_failed`]
const DISCOVERY_LIMIT: u32 = 100;

/// A resource proposed for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: ResourceKind,
    pub name: String,
}

impl Candidate {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// What the sweep did with one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    Deleted,
    AlreadyAbsent,
    /// Left alone (e.g. an endpoint that is still healthy)
    Skipped { reason: String },
    Failed { error: String },
    /// The sweep was interrupted before this candidate was handled
    Cancelled,
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupAction::Deleted => write!(f, "deleted"),
            CleanupAction::AlreadyAbsent => write!(f, "already absent"),
            CleanupAction::Skipped { reason } => write!(f, "skipped ({reason})"),
            CleanupAction::Failed { error } => write!(f, "failed: {error}"),
            CleanupAction::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEntry {
    pub candidate: Candidate,
    pub action: CleanupAction,
}

/// Per-candidate results, in the order the candidates were given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub entries: Vec<CleanupEntry>,
}

impl CleanupReport {
    pub fn deleted(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::Deleted))
    }

    pub fn already_absent(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::AlreadyAbsent))
    }

    pub fn failures(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::Failed { .. }))
    }

    /// Whether any candidate was left untouched because of cancellation
    pub fn interrupted(&self) -> bool {
        self.count(|a| matches!(a, CleanupAction::Cancelled)) > 0
    }

    fn count(&self, pred: impl Fn(&CleanupAction) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.action)).count()
    }
}

pub struct CleanupAgent {
    client: Arc<dyn ControlPlane>,
    namer: ResourceNamer,
    poller: StatusPoller,
}

impl CleanupAgent {
    pub fn new(client: Arc<dyn ControlPlane>, config: &PipelineConfig, cancel: CancelToken) -> Self {
        let policy = PollPolicy::unbounded(config.poll_interval)
            .with_transient_retries(config.transient_retries);

        Self {
            client,
            namer: ResourceNamer::new(config.purpose.clone()),
            poller: StatusPoller::new(policy, cancel),
        }
    }

    /// Deletes every candidate that should go, continuing past failures
    pub async fn sweep(&self, candidates: &[Candidate]) -> CleanupReport {
        let mut tasks = JoinSet::new();

        for (idx, candidate) in candidates.iter().cloned().enumerate() {
            let client = Arc::clone(&self.client);
            let poller = self.poller.clone();
            tasks.spawn(async move {
                let action = sweep_one(&*client, &poller, &candidate).await;
                (idx, action)
            });
        }

        let mut actions: Vec<Option<CleanupAction>> = vec![None; candidates.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, action)) => actions[idx] = Some(action),
                Err(e) => error!("Cleanup task aborted: {}", e),
            }
        }

        let entries: Vec<CleanupEntry> = candidates
            .iter()
            .cloned()
            .zip(actions)
            .map(|(candidate, action)| {
                let action = action.unwrap_or_else(|| CleanupAction::Failed {
                    error: "cleanup task aborted".to_string(),
                });
                info!("{}: {}", candidate, action);
                CleanupEntry { candidate, action }
            })
            .collect();

        let report = CleanupReport { entries };
        info!(
            "Cleanup finished: {} deleted, {} already absent, {} failed{}",
            report.deleted(),
            report.already_absent(),
            report.failures(),
            if report.interrupted() { " (interrupted)" } else { "" }
        );
        report
    }

    /// Failed endpoints of this pipeline plus their sibling config and model
    pub async fn discover_failed(&self) -> Result<Vec<Candidate>, PollError> {
        let prefix = self.namer.prefix_for(ResourceKind::Endpoint);
        let query = ListQuery::containing(prefix.clone(), DISCOVERY_LIMIT);
        let client = &*self.client;

        let endpoints = self
            .poller
            .retry_transient("list endpoints", || client.list_endpoints(&query))
            .await?;

        let mut candidates = Vec::new();
        for endpoint in endpoints
            .into_iter()
            .filter(|e| e.name.starts_with(&prefix) && should_delete(e.status))
        {
            info!("Found {} endpoint {}", endpoint.status, endpoint.name);
            let siblings = self.namer.siblings_of(&endpoint.name);
            candidates.push(Candidate::new(ResourceKind::Endpoint, endpoint.name));

            if let Some(names) = siblings {
                candidates.push(Candidate::new(
                    ResourceKind::EndpointConfig,
                    names.endpoint_config,
                ));
                candidates.push(Candidate::new(ResourceKind::Model, names.model));
            }
        }

        Ok(candidates)
    }
}

fn should_delete(status: EndpointStatus) -> bool {
    status.is_failure()
}

async fn sweep_one(
    client: &dyn ControlPlane,
    poller: &StatusPoller,
    candidate: &Candidate,
) -> CleanupAction {
    let name = candidate.name.as_str();

    match candidate.kind {
        ResourceKind::Endpoint => {
            let description = poller
                .retry_transient(name, move || client.describe_endpoint(name))
                .await;

            match description {
                Ok(description) if should_delete(description.status) => {
                    delete(poller, name, move || client.delete_endpoint(name)).await
                }
                Ok(description) => CleanupAction::Skipped {
                    reason: format!("status {}", description.status),
                },
                Err(e) => absent_or_failed(e),
            }
        }
        ResourceKind::EndpointConfig => {
            delete(poller, name, move || client.delete_endpoint_config(name)).await
        }
        ResourceKind::Model => delete(poller, name, move || client.delete_model(name)).await,
        ResourceKind::TrainingJob | ResourceKind::WorkflowRun => CleanupAction::Skipped {
            reason: format!("{} is not deletable", candidate.kind),
        },
    }
}

async fn delete<F, Fut>(poller: &StatusPoller, name: &str, op: F) -> CleanupAction
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = pipewright_client::Result<()>>,
{
    match poller.retry_transient(name, op).await {
        Ok(()) => CleanupAction::Deleted,
        Err(e) => absent_or_failed(e),
    }
}

fn absent_or_failed(err: PollError) -> CleanupAction {
    match err {
        PollError::Client(e) if e.is_not_found() => CleanupAction::AlreadyAbsent,
        PollError::Cancelled => CleanupAction::Cancelled,
        other => {
            warn!("Cleanup call failed: {}", other);
            CleanupAction::Failed {
                error: other.to_string(),
            }
        }
    }
}
