//! Training service DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::status::{StatusReport, TrainingJobStatus};
use crate::dto::Tag;

/// Request to create a training job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrainingJob {
    pub name: String,
    pub role_arn: String,
    pub image: String,
    pub input_uri: String,
    pub content_type: String,
    pub output_path: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub max_runtime_seconds: u64,
    pub hyperparameters: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
}

/// Full description of a training job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJobDescription {
    pub name: String,
    pub status: TrainingJobStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Model artifact location, present once the job has completed
    #[serde(default)]
    pub artifact_location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl StatusReport for TrainingJobDescription {
    type Status = TrainingJobStatus;

    fn status(&self) -> TrainingJobStatus {
        self.status
    }
}

/// Training job entry returned by list calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJobSummary {
    pub name: String,
    pub status: TrainingJobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}
