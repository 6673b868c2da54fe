//! ETL workflow stage

use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::{ResourceKind, ResourceRecord};
use pipewright_core::domain::status::LifecycleStatus;
use pipewright_core::dto::workflow::WorkflowRunDescription;
use std::sync::Arc;
use tracing::info;

use super::{observe, resource_failed};
use crate::config::PipelineConfig;
use crate::error::{StageError, StageResult};
use crate::scheduler::{CancelToken, PollOutcome, PollPolicy, StatusPoller, TerminalStates};

/// Starts a workflow run and waits for it under a wall-clock ceiling
pub struct WorkflowStage {
    client: Arc<dyn ControlPlane>,
    poller: StatusPoller,
}

impl WorkflowStage {
    pub fn new(client: Arc<dyn ControlPlane>, config: &PipelineConfig, cancel: CancelToken) -> Self {
        let policy = PollPolicy::elapsed(config.poll_interval, config.workflow_max_wait)
            .with_transient_retries(config.transient_retries);

        Self {
            client,
            poller: StatusPoller::new(policy, cancel),
        }
    }

    /// Runs `workflow_name` to completion; the record is named by run id
    pub async fn run(&self, workflow_name: &str) -> StageResult<ResourceRecord> {
        let client = &*self.client;

        let started = self
            .poller
            .retry_transient(workflow_name, move || {
                client.start_workflow_run(workflow_name)
            })
            .await?;
        let run_id = started.run_id.as_str();
        info!("Started workflow {} run {}", workflow_name, run_id);

        let label = format!("{}/{}", workflow_name, run_id);
        let outcome = self
            .poller
            .poll(&label, &TerminalStates::default(), move || {
                client.get_workflow_run(workflow_name, run_id)
            })
            .await?;

        let mut record = ResourceRecord::new(ResourceKind::WorkflowRun, run_id);

        match outcome {
            PollOutcome::Terminal(description) => {
                observe(
                    &mut record,
                    description.status,
                    description.error_message.clone(),
                );
                record.created_at = description.started_on;

                if description.status.is_failure() {
                    return Err(resource_failed(record));
                }

                info!("Workflow run {} completed", label);
                Ok(record)
            }
            PollOutcome::TimedOut { last, .. } => {
                if let Some(description) = last {
                    observe(&mut record, description.status, None);
                    record.created_at = description.started_on;
                }
                Err(StageError::TimedOut { record })
            }
        }
    }

    /// Most recent run of a workflow, if it has ever run
    pub async fn latest(&self, workflow_name: &str) -> StageResult<Option<WorkflowRunDescription>> {
        let client = &*self.client;
        let runs = self
            .poller
            .retry_transient(workflow_name, move || {
                client.list_workflow_runs(workflow_name, 1)
            })
            .await?;

        Ok(runs.into_iter().next())
    }
}
