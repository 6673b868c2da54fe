//! Stage error types

use pipewright_client::ClientError;
use pipewright_core::domain::resource::ResourceRecord;
use pipewright_core::domain::run::RunOutcome;
use thiserror::Error;

use crate::scheduler::PollError;

pub type StageResult<T> = std::result::Result<T, StageError>;

/// Why a stage could not produce its output
#[derive(Debug, Error)]
pub enum StageError {
    /// Required input is missing; retrying will not help
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The control plane reported a terminal failure status
    #[error("{} {} failed: {reason}", .record.kind(), .record.name())]
    ResourceFailed {
        record: ResourceRecord,
        reason: String,
    },

    /// The polling ceiling was reached; the resource may still settle
    #[error("timed out waiting for {record}")]
    TimedOut { record: ResourceRecord },

    #[error("training job {0} completed without a model artifact")]
    MissingArtifact(String),

    #[error("cancelled")]
    Cancelled,

    #[error("control plane error: {0}")]
    ControlPlane(#[from] ClientError),
}

impl StageError {
    /// Last known record of the resource the stage was waiting on
    pub fn record(&self) -> Option<&ResourceRecord> {
        match self {
            StageError::ResourceFailed { record, .. } | StageError::TimedOut { record } => {
                Some(record)
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StageError::TimedOut { .. })
    }

    /// Maps the error onto a pipeline run outcome
    pub fn into_outcome(self) -> RunOutcome {
        match self {
            StageError::TimedOut { record } => RunOutcome::TimedOut {
                resource: record.name().to_string(),
            },
            StageError::Cancelled => RunOutcome::Cancelled,
            other => RunOutcome::Failed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<PollError> for StageError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Cancelled => StageError::Cancelled,
            PollError::Client(e) => StageError::ControlPlane(e),
        }
    }
}
