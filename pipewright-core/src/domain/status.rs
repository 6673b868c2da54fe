//! Lifecycle status types
//!
//! Each provisioned resource kind reports its own status vocabulary. The
//! [`LifecycleStatus`] trait tells the poller which of those statuses are
//! terminal, and whether they mean success or failure.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// A status reported by the control plane for a long-running resource
pub trait LifecycleStatus: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {
    /// Statuses that end polling successfully
    const SUCCESS: &'static [Self];

    /// Statuses that end polling with a failure
    const FAILURE: &'static [Self];

    fn is_success(&self) -> bool {
        Self::SUCCESS.contains(self)
    }

    fn is_failure(&self) -> bool {
        Self::FAILURE.contains(self)
    }

    fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }
}

/// Anything the control plane describes with a status
///
/// Implemented by the describe responses so the poller can hand back the
/// full description (failure reason, artifact location) on termination.
pub trait StatusReport {
    type Status: LifecycleStatus;

    fn status(&self) -> Self::Status;
}

/// Training job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingJobStatus {
    InProgress,
    Completed,
    Failed,
    Stopping,
    Stopped,
}

impl LifecycleStatus for TrainingJobStatus {
    const SUCCESS: &'static [Self] = &[Self::Completed];
    const FAILURE: &'static [Self] = &[Self::Failed, Self::Stopped];
}

impl Display for TrainingJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingJobStatus::InProgress => write!(f, "InProgress"),
            TrainingJobStatus::Completed => write!(f, "Completed"),
            TrainingJobStatus::Failed => write!(f, "Failed"),
            TrainingJobStatus::Stopping => write!(f, "Stopping"),
            TrainingJobStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Inference endpoint status
///
/// `Updating`, `SystemUpdating`, `RollingBack` and `Deleting` only occur
/// when an endpoint is touched outside a fresh deployment; a poller treats
/// them as "not usable yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointStatus {
    Creating,
    Updating,
    SystemUpdating,
    RollingBack,
    InService,
    Deleting,
    OutOfService,
    Failed,
}

impl LifecycleStatus for EndpointStatus {
    const SUCCESS: &'static [Self] = &[Self::InService];
    const FAILURE: &'static [Self] = &[Self::Failed, Self::OutOfService];
}

impl Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointStatus::Creating => write!(f, "Creating"),
            EndpointStatus::Updating => write!(f, "Updating"),
            EndpointStatus::SystemUpdating => write!(f, "SystemUpdating"),
            EndpointStatus::RollingBack => write!(f, "RollingBack"),
            EndpointStatus::InService => write!(f, "InService"),
            EndpointStatus::Deleting => write!(f, "Deleting"),
            EndpointStatus::OutOfService => write!(f, "OutOfService"),
            EndpointStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// ETL workflow run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowRunStatus {
    Running,
    Completed,
    Stopping,
    Stopped,
    Error,
}

impl LifecycleStatus for WorkflowRunStatus {
    const SUCCESS: &'static [Self] = &[Self::Completed];
    const FAILURE: &'static [Self] = &[Self::Stopped, Self::Error];
}

impl Display for WorkflowRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowRunStatus::Running => write!(f, "Running"),
            WorkflowRunStatus::Completed => write!(f, "Completed"),
            WorkflowRunStatus::Stopping => write!(f, "Stopping"),
            WorkflowRunStatus::Stopped => write!(f, "Stopped"),
            WorkflowRunStatus::Error => write!(f, "Error"),
        }
    }
}
