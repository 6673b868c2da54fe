//! ETL workflow service DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::status::{StatusReport, WorkflowRunStatus};

/// Response to starting a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedWorkflowRun {
    pub run_id: String,
}

/// Description of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunDescription {
    pub workflow_name: String,
    pub run_id: String,
    pub status: WorkflowRunStatus,
    #[serde(default)]
    pub started_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StatusReport for WorkflowRunDescription {
    type Status = WorkflowRunStatus;

    fn status(&self) -> WorkflowRunStatus {
        self.status
    }
}
