//! Training stage
//!
//! Verifies that training data exists, submits a training job and waits for
//! it to finish. A previously completed job can be reused instead of
//! retraining when the freshness policy allows it.

use chrono::Utc;
use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::{DataLocation, ResourceKind, ResourceRecord};
use pipewright_core::domain::status::TrainingJobStatus;
use pipewright_core::dto::ListQuery;
use pipewright_core::dto::training::{CreateTrainingJob, TrainingJobDescription};
use pipewright_core::naming::ResourceNamer;
use std::sync::Arc;
use tracing::{debug, info};

use super::{create_resource, observe, resource_failed};
use crate::config::{FreshnessPolicy, PipelineConfig};
use crate::error::{StageError, StageResult};
use crate::scheduler::{CancelToken, PollOutcome, PollPolicy, StatusPoller, TerminalStates};

/// Jobs inspected when looking for a reusable model
const REUSE_LOOKBACK: u32 = 5;

/// A completed training job and the model artifact it produced
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub record: ResourceRecord,
    pub artifact_location: String,
}

pub struct TrainingStage {
    client: Arc<dyn ControlPlane>,
    config: Arc<PipelineConfig>,
    namer: ResourceNamer,
    poller: StatusPoller,
}

impl TrainingStage {
    pub fn new(client: Arc<dyn ControlPlane>, config: Arc<PipelineConfig>, cancel: CancelToken) -> Self {
        let policy = PollPolicy::unbounded(config.poll_interval)
            .with_transient_retries(config.transient_retries);

        Self {
            namer: ResourceNamer::new(config.purpose.clone()),
            poller: StatusPoller::new(policy, cancel),
            client,
            config,
        }
    }

    /// Trains a model from `input` after checking that data is present
    pub async fn run(&self, input: &DataLocation) -> StageResult<TrainedModel> {
        self.check_data(&input.bucket).await?;
        self.train(input).await
    }

    /// Counts objects under the training prefix, failing when there are none
    pub async fn check_data(&self, bucket: &str) -> StageResult<usize> {
        let prefix = self.config.training_prefix.as_str();
        let client = &*self.client;

        let objects = self
            .poller
            .retry_transient("list training data", move || client.list_objects(bucket, prefix))
            .await?;

        if objects.is_empty() {
            return Err(StageError::Precondition(format!(
                "no training data found under s3://{}/{}",
                bucket, prefix
            )));
        }

        info!(
            "Found {} training object(s) under s3://{}/{}",
            objects.len(),
            bucket,
            prefix
        );
        Ok(objects.len())
    }

    /// Submits a training job and waits for it without checking data first
    pub async fn train(&self, input: &DataLocation) -> StageResult<TrainedModel> {
        let record = self.submit(input).await?;
        self.await_completion(record.name()).await
    }

    /// Creates a training job on `input` without waiting for it
    pub async fn submit(&self, input: &DataLocation) -> StageResult<ResourceRecord> {
        let name = self.namer.name_for(ResourceKind::TrainingJob);
        let request = self.request_for(&name, input);
        let client = &*self.client;

        info!("Creating training job {} on {}", name, input);
        create_resource(&self.poller, &name, || client.create_training_job(&request)).await?;

        Ok(ResourceRecord::new(ResourceKind::TrainingJob, name))
    }

    /// Waits for an existing training job to reach a terminal status
    pub async fn await_completion(&self, name: &str) -> StageResult<TrainedModel> {
        let client = &*self.client;
        let outcome = self
            .poller
            .poll(name, &TerminalStates::default(), move || {
                client.describe_training_job(name)
            })
            .await?;

        let mut record = ResourceRecord::new(ResourceKind::TrainingJob, name);

        match outcome {
            PollOutcome::Terminal(description) => completed(record, description),
            PollOutcome::TimedOut { last, .. } => {
                if let Some(description) = last {
                    observe(&mut record, description.status, None);
                }
                Err(StageError::TimedOut { record })
            }
        }
    }

    /// Newest completed training job the freshness policy accepts, if any
    pub async fn find_reusable(
        &self,
        freshness: FreshnessPolicy,
    ) -> StageResult<Option<TrainedModel>> {
        if freshness == FreshnessPolicy::Never {
            return Ok(None);
        }

        let prefix = self.namer.prefix_for(ResourceKind::TrainingJob);
        let query = ListQuery::containing(prefix.clone(), REUSE_LOOKBACK);
        let client = &*self.client;

        let mut jobs = self
            .poller
            .retry_transient("list training jobs", || client.list_training_jobs(&query))
            .await?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let now = Utc::now();
        for job in jobs.iter().filter(|j| j.name.starts_with(&prefix)) {
            if job.status != TrainingJobStatus::Completed {
                continue;
            }

            if let FreshnessPolicy::MaxAge(max_age) = freshness {
                if now - job.created_at > max_age {
                    debug!("{} is older than {}h, not reusing", job.name, max_age.num_hours());
                    // Sorted newest first: everything after is older still
                    break;
                }
            }

            let description = self.describe(&job.name).await?;
            if let Ok(model) = completed(
                ResourceRecord::new(ResourceKind::TrainingJob, job.name.clone()),
                description,
            ) {
                info!(
                    "Reusing training job {} ({})",
                    job.name, model.artifact_location
                );
                return Ok(Some(model));
            }
        }

        Ok(None)
    }

    pub async fn describe(&self, name: &str) -> StageResult<TrainingJobDescription> {
        let client = &*self.client;
        Ok(self
            .poller
            .retry_transient(name, move || client.describe_training_job(name))
            .await?)
    }

    fn request_for(&self, name: &str, input: &DataLocation) -> CreateTrainingJob {
        let config = &self.config;
        CreateTrainingJob {
            name: name.to_string(),
            role_arn: config.role_arn.clone(),
            image: config.container_image.clone(),
            input_uri: input.uri(),
            content_type: "text/csv".to_string(),
            output_path: config.output_path.clone(),
            instance_type: config.training_instance_type.clone(),
            instance_count: config.training_instance_count,
            volume_size_gb: config.training_volume_gb,
            max_runtime_seconds: config.training_max_runtime.as_secs(),
            hyperparameters: config.hyperparameters.clone(),
            tags: config.tags.clone(),
        }
    }
}

/// Turns a terminal training description into the stage's output
fn completed(
    mut record: ResourceRecord,
    description: TrainingJobDescription,
) -> StageResult<TrainedModel> {
    observe(
        &mut record,
        description.status,
        description.failure_reason.clone(),
    );
    record.created_at = description.created_at;

    if description.status != TrainingJobStatus::Completed {
        return Err(resource_failed(record));
    }

    let artifact_location = description
        .artifact_location
        .ok_or_else(|| StageError::MissingArtifact(record.name().to_string()))?;

    info!(
        "Training job {} completed, artifact at {}",
        record.name(),
        artifact_location
    );
    Ok(TrainedModel {
        record,
        artifact_location,
    })
}
