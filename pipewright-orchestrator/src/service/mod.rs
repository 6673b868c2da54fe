//! Service layer
//!
//! One executor per pipeline stage. Each stage owns a handle to the control
//! plane and a poller, takes its input explicitly and returns a typed output
//! for the next stage.

mod cleanup;
mod deployment;
mod invocation;
mod report;
mod training;
mod workflow;

pub use cleanup::{Candidate, CleanupAction, CleanupAgent, CleanupEntry, CleanupReport};
pub use deployment::{DeployedEndpoint, DeploymentStage};
pub use invocation::{InvocationTestStage, assess};
pub use report::{PipelineStatus, Section};
pub use training::{TrainedModel, TrainingStage};
pub use workflow::WorkflowStage;

use pipewright_client::ClientError;
use pipewright_core::domain::resource::ResourceRecord;
use pipewright_core::domain::status::LifecycleStatus;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

use crate::error::{StageError, StageResult};
use crate::scheduler::{PollError, StatusPoller};

/// Issues a creation call with transient retries
///
/// A conflict on a retried call means an earlier attempt reached the control
/// plane before the connection dropped, so the resource exists.
pub(crate) async fn create_resource<R, F, Fut>(
    poller: &StatusPoller,
    label: &str,
    mut op: F,
) -> StageResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, ClientError>>,
{
    let calls = AtomicU32::new(0);
    let result = poller
        .retry_transient(label, || {
            calls.fetch_add(1, Ordering::Relaxed);
            op()
        })
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(PollError::Client(e)) if e.is_conflict() && calls.load(Ordering::Relaxed) > 1 => {
            info!("{} already exists after retry, treating as created", label);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Copies an observed status onto a record
pub(crate) fn observe<S: LifecycleStatus>(
    record: &mut ResourceRecord,
    status: S,
    failure_reason: Option<String>,
) {
    record.observe(status, status.is_failure(), failure_reason);
}

/// Builds the failure error for a record observed in a failure state
pub(crate) fn resource_failed(record: ResourceRecord) -> StageError {
    let reason = record
        .failure_reason
        .clone()
        .or_else(|| record.status.clone())
        .unwrap_or_else(|| "unknown".to_string());
    StageError::ResourceFailed { record, reason }
}
