//! Pipeline orchestrator
//!
//! Walks the stages in order: optional ETL workflow, data check, training
//! (or reuse), deployment (or reuse) and invocation test. Each stage's output
//! is handed explicitly to the next; the run is concluded into a
//! [`RunReport`] whatever happens.

use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::DataLocation;
use pipewright_core::domain::run::{PipelineRun, RunOutcome, RunReport};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{StageError, StageResult};
use crate::scheduler::CancelToken;
use crate::service::{
    DeploymentStage, InvocationTestStage, TrainedModel, TrainingStage, WorkflowStage,
};

pub struct PipelineOrchestrator {
    config: Arc<PipelineConfig>,
    training: TrainingStage,
    deployment: DeploymentStage,
    workflow: WorkflowStage,
    invocation: InvocationTestStage,
    cancel: CancelToken,
}

impl PipelineOrchestrator {
    pub fn new(client: Arc<dyn ControlPlane>, config: PipelineConfig, cancel: CancelToken) -> Self {
        let config = Arc::new(config);

        Self {
            training: TrainingStage::new(Arc::clone(&client), Arc::clone(&config), cancel.clone()),
            deployment: DeploymentStage::new(Arc::clone(&client), Arc::clone(&config), cancel.clone()),
            workflow: WorkflowStage::new(Arc::clone(&client), &config, cancel.clone()),
            invocation: InvocationTestStage::new(client, &config, cancel.clone()),
            config,
            cancel,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole pipeline and reports how it ended
    pub async fn run(&self) -> RunReport {
        let mut run = PipelineRun::start();
        info!("Starting pipeline run {}", run.id());

        let outcome = match self.execute(&mut run).await {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    StageError::TimedOut { record } => {
                        warn!("Pipeline run {} timed out waiting for {}", run.id(), record)
                    }
                    StageError::Cancelled => warn!("Pipeline run {} cancelled", run.id()),
                    other => error!("Pipeline run {} failed: {}", run.id(), other),
                }
                e.into_outcome()
            }
        };

        let report = run.conclude(outcome);
        info!("Pipeline run {} finished: {}", report.id, report.outcome);
        report
    }

    async fn execute(&self, run: &mut PipelineRun) -> StageResult<RunOutcome> {
        let input = self.config.training_data();

        // 1. ETL workflow, which populates the training prefix
        if let Some(workflow_name) = &self.config.workflow_name {
            self.checkpoint()?;
            match self.workflow.run(workflow_name).await {
                Ok(record) => run.record_workflow_run(record),
                Err(e) => {
                    if let Some(record) = e.record() {
                        run.record_workflow_run(record.clone());
                    }
                    return Err(e);
                }
            }
        }

        // 2. Data availability
        self.checkpoint()?;
        self.training.check_data(&input.bucket).await?;

        // 3. Training
        self.checkpoint()?;
        let (trained, reused) = match self.training.find_reusable(self.config.freshness).await? {
            Some(model) => (model, true),
            None => (self.train(run, &input).await?, false),
        };
        let artifact_location = trained.artifact_location.clone();
        run.record_training(trained.record, trained.artifact_location, reused);

        // 4. Deployment
        self.checkpoint()?;
        let reused_endpoint = if run.training_reused() && self.config.reuse_active_endpoint {
            self.deployment.find_in_service().await?
        } else {
            None
        };

        let endpoint = match reused_endpoint {
            Some(record) => {
                let name = record.name().to_string();
                run.record_endpoint(record, true);
                name
            }
            None => self.deploy(run, &artifact_location).await?,
        };

        // 5. Invocation test
        self.checkpoint()?;
        let report = self
            .invocation
            .run(&endpoint, &self.config.samples)
            .await?;
        let operational = report.is_operational();
        let (succeeded, total) = (report.succeeded(), report.results.len());
        run.record_invocation(report);

        if !operational {
            return Ok(RunOutcome::Failed {
                reason: format!(
                    "endpoint {} answered only {}/{} sample(s)",
                    endpoint, succeeded, total
                ),
            });
        }

        Ok(RunOutcome::Succeeded)
    }

    /// Trains a new model, recording the job even when it does not complete
    async fn train(&self, run: &mut PipelineRun, input: &DataLocation) -> StageResult<TrainedModel> {
        let submitted = self.training.submit(input).await?;
        let name = submitted.name().to_string();
        run.record_training_job(submitted);

        match self.training.await_completion(&name).await {
            Ok(trained) => Ok(trained),
            Err(e) => {
                if let Some(record) = e.record() {
                    run.record_training_job(record.clone());
                }
                Err(e)
            }
        }
    }

    /// Creates the inference resources one by one, recording each as it exists
    async fn deploy(&self, run: &mut PipelineRun, artifact_location: &str) -> StageResult<String> {
        let names = self.deployment.names();

        let model = self
            .deployment
            .create_model(&names.model, artifact_location)
            .await?;
        run.record_model(model);

        let config = self
            .deployment
            .create_endpoint_config(&names.endpoint_config, &names.model)
            .await?;
        run.record_endpoint_config(config);

        let endpoint = self
            .deployment
            .create_endpoint(&names.endpoint, &names.endpoint_config)
            .await?;
        run.record_endpoint(endpoint, false);

        let policy = DeploymentStage::fast_path(&self.config);
        match self.deployment.await_endpoint(&names.endpoint, policy).await {
            Ok(record) => {
                run.record_endpoint(record, false);
                Ok(names.endpoint)
            }
            Err(e) => {
                if let Some(record) = e.record() {
                    run.record_endpoint(record.clone(), false);
                }
                Err(e)
            }
        }
    }

    fn checkpoint(&self) -> StageResult<()> {
        if self.cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        Ok(())
    }
}
