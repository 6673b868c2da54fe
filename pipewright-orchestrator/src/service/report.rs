//! Pipeline status report
//!
//! Snapshot of everything the pipeline touches: data under each stage
//! prefix, produced artifacts, the newest training jobs, models and
//! endpoints, and endpoints old enough to be removed. Each section carries its own error so one unreachable service
//! does not hide the rest.

use chrono::Utc;
use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::DataLocation;
use pipewright_core::dto::ListQuery;
use pipewright_core::dto::inference::{EndpointSummary, ModelSummary};
use pipewright_core::dto::storage::ObjectSummary;
use pipewright_core::dto::training::TrainingJobSummary;
use pipewright_core::dto::workflow::WorkflowRunDescription;
use tracing::debug;

use crate::config::PipelineConfig;

/// Data prefixes counted by the report
pub const DATA_PREFIXES: [&str; 3] = ["raw/", "cleaned/", "training/"];

const ARTIFACT_SUFFIX: &str = ".tar.gz";

/// Endpoints inspected for the stale section
const STALE_LOOKUP_LIMIT: u32 = 100;

/// One report section: its value, or why it could not be collected
pub type Section<T> = Result<T, String>;

#[derive(Debug, Clone)]
pub struct PipelineStatus {
    /// Latest run of the configured workflow; `None` when no workflow is set
    pub workflow: Option<Section<Option<WorkflowRunDescription>>>,
    /// Object count per data prefix
    pub data: Vec<(String, Section<usize>)>,
    pub artifacts: Section<Vec<ObjectSummary>>,
    pub training_jobs: Section<Vec<TrainingJobSummary>>,
    pub models: Section<Vec<ModelSummary>>,
    pub endpoints: Section<Vec<EndpointSummary>>,
    /// Pipeline endpoints older than `stale_endpoint_age`, oldest first
    pub stale_endpoints: Section<Vec<EndpointSummary>>,
}

impl PipelineStatus {
    /// Queries every section, listing at most `recent` items per resource type
    pub async fn collect(client: &dyn ControlPlane, config: &PipelineConfig, recent: u32) -> Self {
        let workflow = match &config.workflow_name {
            Some(name) => Some(
                client
                    .list_workflow_runs(name, 1)
                    .await
                    .map(|runs| runs.into_iter().next())
                    .map_err(|e| e.to_string()),
            ),
            None => None,
        };

        let mut data = Vec::with_capacity(DATA_PREFIXES.len());
        for prefix in DATA_PREFIXES {
            let count = client
                .list_objects(&config.data_bucket, prefix)
                .await
                .map(|objects| objects.len())
                .map_err(|e| e.to_string());
            debug!("{}: {:?}", prefix, count);
            data.push((prefix.to_string(), count));
        }

        let artifacts = match DataLocation::parse(&config.output_path) {
            Some(output) => client
                .list_objects(&output.bucket, &output.key)
                .await
                .map(|objects| {
                    objects
                        .into_iter()
                        .filter(|o| o.key.ends_with(ARTIFACT_SUFFIX))
                        .collect()
                })
                .map_err(|e| e.to_string()),
            None => Err(format!("invalid output path {}", config.output_path)),
        };

        let query = ListQuery::newest(recent);
        let training_jobs = client
            .list_training_jobs(&query)
            .await
            .map_err(|e| e.to_string());
        let models = client.list_models(&query).await.map_err(|e| e.to_string());
        let endpoints = client
            .list_endpoints(&query)
            .await
            .map_err(|e| e.to_string());

        let cutoff = Utc::now() - config.stale_endpoint_age;
        let stale_endpoints = client
            .list_endpoints(&ListQuery::containing(config.purpose.clone(), STALE_LOOKUP_LIMIT))
            .await
            .map(|endpoints| {
                let mut stale: Vec<_> = endpoints
                    .into_iter()
                    .filter(|e| e.name.contains(&config.purpose) && e.created_at < cutoff)
                    .collect();
                stale.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                stale
            })
            .map_err(|e| e.to_string());

        Self {
            workflow,
            data,
            artifacts,
            training_jobs,
            models,
            endpoints,
            stale_endpoints,
        }
    }
}
