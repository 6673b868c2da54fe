//! Pipeline run domain types
//!
//! A [`PipelineRun`] collects the records produced while the orchestrator
//! walks through its stages. Concluding it consumes the run and yields an
//! immutable [`RunReport`]; nothing is persisted beyond the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::prediction::InvocationReport;
use crate::domain::resource::ResourceRecord;

/// Final outcome of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    Succeeded,
    Failed { reason: String },
    /// A polling ceiling was hit; the resource may still become ready
    TimedOut { resource: String },
    Cancelled,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Succeeded => write!(f, "Succeeded"),
            RunOutcome::Failed { reason } => write!(f, "Failed: {reason}"),
            RunOutcome::TimedOut { resource } => {
                write!(f, "TimedOut waiting for {resource}")
            }
            RunOutcome::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// An in-progress pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    id: Uuid,
    started_at: DateTime<Utc>,
    workflow_run: Option<ResourceRecord>,
    training_job: Option<ResourceRecord>,
    training_reused: bool,
    artifact_location: Option<String>,
    model: Option<ResourceRecord>,
    endpoint_config: Option<ResourceRecord>,
    endpoint: Option<ResourceRecord>,
    endpoint_reused: bool,
    invocation: Option<InvocationReport>,
}

impl PipelineRun {
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            workflow_run: None,
            training_job: None,
            training_reused: false,
            artifact_location: None,
            model: None,
            endpoint_config: None,
            endpoint: None,
            endpoint_reused: false,
            invocation: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn record_workflow_run(&mut self, record: ResourceRecord) {
        self.workflow_run = Some(record);
    }

    /// Records a training job that has not produced an artifact (yet)
    pub fn record_training_job(&mut self, record: ResourceRecord) {
        self.training_job = Some(record);
    }

    pub fn record_training(
        &mut self,
        record: ResourceRecord,
        artifact_location: String,
        reused: bool,
    ) {
        self.training_job = Some(record);
        self.artifact_location = Some(artifact_location);
        self.training_reused = reused;
    }

    pub fn record_model(&mut self, record: ResourceRecord) {
        self.model = Some(record);
    }

    pub fn record_endpoint_config(&mut self, record: ResourceRecord) {
        self.endpoint_config = Some(record);
    }

    pub fn record_endpoint(&mut self, record: ResourceRecord, reused: bool) {
        self.endpoint = Some(record);
        self.endpoint_reused = reused;
    }

    pub fn record_invocation(&mut self, report: InvocationReport) {
        self.invocation = Some(report);
    }

    pub fn training_reused(&self) -> bool {
        self.training_reused
    }

    /// Seals the run with its outcome
    pub fn conclude(self, outcome: RunOutcome) -> RunReport {
        let sample_prediction = if outcome.is_success() {
            self.invocation
                .as_ref()
                .and_then(InvocationReport::first_prediction)
        } else {
            None
        };

        RunReport {
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            workflow_run: self.workflow_run,
            training_job: self.training_job,
            training_reused: self.training_reused,
            artifact_location: self.artifact_location,
            model: self.model,
            endpoint_config: self.endpoint_config,
            endpoint: self.endpoint,
            endpoint_reused: self.endpoint_reused,
            invocation: self.invocation,
            sample_prediction,
            outcome,
        }
    }
}

/// Immutable summary of a finished pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub workflow_run: Option<ResourceRecord>,
    pub training_job: Option<ResourceRecord>,
    pub training_reused: bool,
    pub artifact_location: Option<String>,
    pub model: Option<ResourceRecord>,
    pub endpoint_config: Option<ResourceRecord>,
    pub endpoint: Option<ResourceRecord>,
    pub endpoint_reused: bool,
    pub invocation: Option<InvocationReport>,
    pub sample_prediction: Option<f64>,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Records created or reused by this run, in pipeline order
    pub fn resources(&self) -> Vec<&ResourceRecord> {
        [
            &self.workflow_run,
            &self.training_job,
            &self.model,
            &self.endpoint_config,
            &self.endpoint,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::PredictionResult;
    use crate::domain::resource::ResourceKind;

    fn report_with_prediction(value: f64) -> InvocationReport {
        InvocationReport {
            endpoint_name: "ep".to_string(),
            results: vec![Ok(PredictionResult {
                input_primary: Some(25.0),
                value,
                delta: Some(value - 25.0),
                trend: None,
                warnings: vec![],
            })],
        }
    }

    #[test]
    fn test_sample_prediction_only_on_success() {
        let mut run = PipelineRun::start();
        run.record_invocation(report_with_prediction(26.1));
        let report = run.conclude(RunOutcome::Succeeded);
        assert_eq!(report.sample_prediction, Some(26.1));

        let mut run = PipelineRun::start();
        run.record_invocation(report_with_prediction(26.1));
        let report = run.conclude(RunOutcome::Failed {
            reason: "unhealthy".to_string(),
        });
        assert_eq!(report.sample_prediction, None);
    }

    #[test]
    fn test_resources_in_pipeline_order() {
        let mut run = PipelineRun::start();
        run.record_endpoint(ResourceRecord::new(ResourceKind::Endpoint, "e"), false);
        run.record_training(
            ResourceRecord::new(ResourceKind::TrainingJob, "t"),
            "loc".to_string(),
            true,
        );
        let report = run.conclude(RunOutcome::Cancelled);

        let names: Vec<_> = report.resources().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["t", "e"]);
        assert!(report.training_reused);
    }
}
