//! In-memory control plane for stage and orchestrator tests
//!
//! Resources live in maps behind a mutex. Status sequences can be scripted
//! per resource type; the last scripted status sticks once the script runs
//! out. Every call is appended to a log so tests can assert ordering.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pipewright_client::{
    ClientError, InferenceService, ObjectStore, Result, TrainingService, WorkflowService,
};
use pipewright_core::domain::status::{EndpointStatus, TrainingJobStatus, WorkflowRunStatus};
use pipewright_core::dto::inference::{
    CreateEndpoint, CreateEndpointConfig, CreateModel, EndpointDescription, EndpointSummary,
    ModelSummary,
};
use pipewright_core::dto::storage::ObjectSummary;
use pipewright_core::dto::training::{
    CreateTrainingJob, TrainingJobDescription, TrainingJobSummary,
};
use pipewright_core::dto::workflow::{StartedWorkflowRun, WorkflowRunDescription};
use pipewright_core::dto::{CreatedResource, ListQuery};
use pipewright_orchestrator::{FreshnessPolicy, PipelineConfig};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

pub const BUCKET: &str = "sagemaker-ml-pipeline-data";
pub const ARTIFACT: &str = "s3://sagemaker-ml-pipeline-data/model-artifacts/output/model.tar.gz";

/// Default pipeline configuration with no freshness reuse
pub fn test_config() -> PipelineConfig {
    PipelineConfig::default().with_freshness(FreshnessPolicy::Never)
}

/// Scripted status sequence; the final entry repeats forever
#[derive(Debug, Clone)]
struct Script<S> {
    steps: VecDeque<S>,
}

impl<S: Copy> Script<S> {
    fn new(steps: Vec<S>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    fn next(&mut self, fallback: S) -> S {
        if self.steps.len() > 1 {
            self.steps.pop_front().unwrap_or(fallback)
        } else {
            self.steps.front().copied().unwrap_or(fallback)
        }
    }
}

#[derive(Debug, Clone)]
struct TrainingJob {
    status: TrainingJobStatus,
    created_at: DateTime<Utc>,
    artifact_location: Option<String>,
    failure_reason: Option<String>,
}

#[derive(Debug, Clone)]
struct Endpoint {
    status: EndpointStatus,
    config_name: String,
    created_at: DateTime<Utc>,
    failure_reason: Option<String>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), Vec<u8>>,
    training_jobs: BTreeMap<String, TrainingJob>,
    training_script: Option<Script<TrainingJobStatus>>,
    training_artifact: Option<String>,
    training_failure: Option<String>,
    models: BTreeMap<String, DateTime<Utc>>,
    endpoint_configs: BTreeMap<String, String>,
    endpoints: BTreeMap<String, Endpoint>,
    endpoint_script: Option<Script<EndpointStatus>>,
    endpoint_failure: Option<String>,
    /// Per-call invocation responses; an empty queue answers `default_prediction`
    invocations: VecDeque<std::result::Result<String, (u16, String)>>,
    default_prediction: String,
    workflow_script: Option<Script<WorkflowRunStatus>>,
    workflow_runs: Vec<WorkflowRunDescription>,
    /// Object written when a workflow run completes
    workflow_output: Option<(String, String)>,
    /// Errors returned by the next calls of a given operation
    failures: BTreeMap<&'static str, VecDeque<(u16, String)>>,
    calls: Vec<String>,
}

pub struct InMemoryControlPlane {
    state: Mutex<State>,
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                default_prediction: "26.4".to_string(),
                ..State::default()
            }),
        }
    }

    /// Control plane with one training object in the default bucket
    pub fn with_training_data() -> Self {
        let plane = Self::new();
        plane.put(BUCKET, "training/realistic_training_data.csv", b"25.5,68.2");
        plane
    }

    pub fn put(&self, bucket: &str, key: &str, body: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
    }

    pub fn script_training(&self, statuses: Vec<TrainingJobStatus>, artifact: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.training_script = Some(Script::new(statuses));
        state.training_artifact = artifact.map(str::to_string);
    }

    pub fn script_training_failure(&self, reason: &str) {
        self.state.lock().unwrap().training_failure = Some(reason.to_string());
    }

    pub fn script_endpoint(&self, statuses: Vec<EndpointStatus>, failure_reason: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.endpoint_script = Some(Script::new(statuses));
        state.endpoint_failure = failure_reason.map(str::to_string);
    }

    pub fn script_workflow(&self, statuses: Vec<WorkflowRunStatus>) {
        self.state.lock().unwrap().workflow_script = Some(Script::new(statuses));
    }

    /// Completed workflow runs write the default training object
    pub fn workflow_writes_training_data(&self) {
        self.state.lock().unwrap().workflow_output = Some((
            BUCKET.to_string(),
            "training/realistic_training_data.csv".to_string(),
        ));
    }

    /// Responses for successive invocations; `Err((status, message))` fails one call
    pub fn script_invocations(&self, responses: Vec<std::result::Result<&str, (u16, &str)>>) {
        self.state.lock().unwrap().invocations = responses
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(|(s, m)| (s, m.to_string())))
            .collect();
    }

    /// Makes the next call of `operation` fail with `status`
    pub fn fail_next(&self, operation: &'static str, status: u16, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back((status, message.to_string()));
    }

    pub fn seed_training_job(
        &self,
        name: &str,
        status: TrainingJobStatus,
        age: Duration,
        artifact: Option<&str>,
    ) {
        self.state.lock().unwrap().training_jobs.insert(
            name.to_string(),
            TrainingJob {
                status,
                created_at: Utc::now() - age,
                artifact_location: artifact.map(str::to_string),
                failure_reason: None,
            },
        );
    }

    pub fn seed_endpoint(&self, name: &str, status: EndpointStatus, failure_reason: Option<&str>) {
        self.seed_endpoint_aged(name, status, failure_reason, Duration::zero());
    }

    pub fn seed_endpoint_aged(
        &self,
        name: &str,
        status: EndpointStatus,
        failure_reason: Option<&str>,
        age: Duration,
    ) {
        self.state.lock().unwrap().endpoints.insert(
            name.to_string(),
            Endpoint {
                status,
                config_name: String::new(),
                created_at: Utc::now() - age,
                failure_reason: failure_reason.map(str::to_string),
            },
        );
    }

    pub fn seed_model(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .models
            .insert(name.to_string(), Utc::now());
    }

    pub fn seed_endpoint_config(&self, name: &str, model_name: &str) {
        self.state
            .lock()
            .unwrap()
            .endpoint_configs
            .insert(name.to_string(), model_name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls to `operation`
    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    pub fn has_endpoint(&self, name: &str) -> bool {
        self.state.lock().unwrap().endpoints.contains_key(name)
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.state.lock().unwrap().models.contains_key(name)
    }

    pub fn has_endpoint_config(&self, name: &str) -> bool {
        self.state.lock().unwrap().endpoint_configs.contains_key(name)
    }

    /// Logs the call and returns a scripted failure for it, if any
    fn enter(&self, operation: &'static str, subject: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{}:{}", operation, subject));
        match state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some((status, message)) => Err(ClientError::from_status(status, message)),
            None => Ok(()),
        }
    }
}

fn arn(kind: &str, name: &str) -> CreatedResource {
    CreatedResource {
        arn: format!("arn:aws:sagemaker:us-east-1:000000000000:{}/{}", kind, name),
    }
}

fn matches(query: &ListQuery, name: &str) -> bool {
    query
        .name_contains
        .as_deref()
        .is_none_or(|needle| name.contains(needle))
}

#[async_trait]
impl ObjectStore for InMemoryControlPlane {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        self.enter("list_objects", prefix)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, key), body)| ObjectSummary {
                key: key.clone(),
                size: body.len() as u64,
                last_modified: Utc::now(),
            })
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.enter("get_object", key)?;
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(key.to_string()))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.enter("put_object", key)?;
        self.put(bucket, key, &body);
        Ok(())
    }
}

#[async_trait]
impl TrainingService for InMemoryControlPlane {
    async fn create_training_job(&self, req: &CreateTrainingJob) -> Result<CreatedResource> {
        self.enter("create_training_job", &req.name)?;
        let mut state = self.state.lock().unwrap();
        if state.training_jobs.contains_key(&req.name) {
            return Err(ClientError::Conflict(req.name.clone()));
        }
        state.training_jobs.insert(
            req.name.clone(),
            TrainingJob {
                status: TrainingJobStatus::InProgress,
                created_at: Utc::now(),
                artifact_location: None,
                failure_reason: None,
            },
        );
        Ok(arn("training-job", &req.name))
    }

    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription> {
        self.enter("describe_training_job", name)?;
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let job = state
            .training_jobs
            .get_mut(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;

        if let Some(script) = state.training_script.as_mut() {
            job.status = script.next(job.status);
            match job.status {
                TrainingJobStatus::Completed => {
                    job.artifact_location = state.training_artifact.clone()
                }
                TrainingJobStatus::Failed => job.failure_reason = state.training_failure.clone(),
                _ => {}
            }
        }

        Ok(TrainingJobDescription {
            name: name.to_string(),
            status: job.status,
            failure_reason: job.failure_reason.clone(),
            artifact_location: job.artifact_location.clone(),
            created_at: Some(job.created_at),
            ended_at: None,
        })
    }

    async fn list_training_jobs(&self, query: &ListQuery) -> Result<Vec<TrainingJobSummary>> {
        self.enter("list_training_jobs", query.name_contains.as_deref().unwrap_or(""))?;
        let state = self.state.lock().unwrap();
        let mut jobs: Vec<_> = state
            .training_jobs
            .iter()
            .filter(|(name, _)| matches(query, name))
            .map(|(name, job)| TrainingJobSummary {
                name: name.clone(),
                status: job.status,
                created_at: job.created_at,
                ended_at: None,
            })
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(query.max_results as usize);
        Ok(jobs)
    }
}

#[async_trait]
impl InferenceService for InMemoryControlPlane {
    async fn create_model(&self, req: &CreateModel) -> Result<CreatedResource> {
        self.enter("create_model", &req.name)?;
        let mut state = self.state.lock().unwrap();
        if state.models.contains_key(&req.name) {
            return Err(ClientError::Conflict(req.name.clone()));
        }
        state.models.insert(req.name.clone(), Utc::now());
        Ok(arn("model", &req.name))
    }

    async fn create_endpoint_config(&self, req: &CreateEndpointConfig) -> Result<CreatedResource> {
        self.enter("create_endpoint_config", &req.name)?;
        let mut state = self.state.lock().unwrap();
        if !state.models.contains_key(&req.model_name) {
            return Err(ClientError::InvalidRequest(format!(
                "model {} does not exist",
                req.model_name
            )));
        }
        state
            .endpoint_configs
            .insert(req.name.clone(), req.model_name.clone());
        Ok(arn("endpoint-config", &req.name))
    }

    async fn create_endpoint(&self, req: &CreateEndpoint) -> Result<CreatedResource> {
        self.enter("create_endpoint", &req.name)?;
        let mut state = self.state.lock().unwrap();
        if !state.endpoint_configs.contains_key(&req.config_name) {
            return Err(ClientError::InvalidRequest(format!(
                "endpoint config {} does not exist",
                req.config_name
            )));
        }
        state.endpoints.insert(
            req.name.clone(),
            Endpoint {
                status: EndpointStatus::Creating,
                config_name: req.config_name.clone(),
                created_at: Utc::now(),
                failure_reason: None,
            },
        );
        Ok(arn("endpoint", &req.name))
    }

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription> {
        self.enter("describe_endpoint", name)?;
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let endpoint = state
            .endpoints
            .get_mut(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;

        // Scripts only drive endpoints this control plane created
        if !endpoint.config_name.is_empty() {
            if let Some(script) = state.endpoint_script.as_mut() {
                endpoint.status = script.next(endpoint.status);
                if endpoint.status == EndpointStatus::Failed {
                    endpoint.failure_reason = state.endpoint_failure.clone();
                }
            }
        }

        Ok(EndpointDescription {
            name: name.to_string(),
            arn: Some(arn("endpoint", name).arn),
            config_name: Some(endpoint.config_name.clone()),
            status: endpoint.status,
            failure_reason: endpoint.failure_reason.clone(),
            created_at: Some(endpoint.created_at),
            last_modified_at: None,
        })
    }

    async fn list_endpoints(&self, query: &ListQuery) -> Result<Vec<EndpointSummary>> {
        self.enter("list_endpoints", query.name_contains.as_deref().unwrap_or(""))?;
        let state = self.state.lock().unwrap();
        let mut endpoints: Vec<_> = state
            .endpoints
            .iter()
            .filter(|(name, _)| matches(query, name))
            .map(|(name, e)| EndpointSummary {
                name: name.clone(),
                status: e.status,
                created_at: e.created_at,
                last_modified_at: None,
            })
            .collect();
        endpoints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        endpoints.truncate(query.max_results as usize);
        Ok(endpoints)
    }

    async fn list_models(&self, query: &ListQuery) -> Result<Vec<ModelSummary>> {
        self.enter("list_models", query.name_contains.as_deref().unwrap_or(""))?;
        let state = self.state.lock().unwrap();
        let mut models: Vec<_> = state
            .models
            .iter()
            .filter(|(name, _)| matches(query, name))
            .map(|(name, created_at)| ModelSummary {
                name: name.clone(),
                created_at: *created_at,
            })
            .collect();
        models.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        models.truncate(query.max_results as usize);
        Ok(models)
    }

    async fn delete_endpoint(&self, name: &str) -> Result<()> {
        self.enter("delete_endpoint", name)?;
        self.state
            .lock()
            .unwrap()
            .endpoints
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(name.to_string()))
    }

    async fn delete_endpoint_config(&self, name: &str) -> Result<()> {
        self.enter("delete_endpoint_config", name)?;
        self.state
            .lock()
            .unwrap()
            .endpoint_configs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(name.to_string()))
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        self.enter("delete_model", name)?;
        self.state
            .lock()
            .unwrap()
            .models
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(name.to_string()))
    }

    async fn invoke_endpoint(&self, name: &str, content_type: &str, body: String) -> Result<String> {
        self.enter("invoke_endpoint", &body)?;
        assert_eq!(content_type, "text/csv");
        let mut state = self.state.lock().unwrap();

        match state.endpoints.get(name) {
            Some(e) if e.status == EndpointStatus::InService => {}
            Some(e) => {
                return Err(ClientError::InvalidRequest(format!(
                    "endpoint {} is {}",
                    name, e.status
                )));
            }
            None => return Err(ClientError::NotFound(name.to_string())),
        }

        match state.invocations.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err((status, message))) => Err(ClientError::from_status(status, message)),
            None => Ok(state.default_prediction.clone()),
        }
    }
}

#[async_trait]
impl WorkflowService for InMemoryControlPlane {
    async fn start_workflow_run(&self, workflow_name: &str) -> Result<StartedWorkflowRun> {
        self.enter("start_workflow_run", workflow_name)?;
        let mut state = self.state.lock().unwrap();
        let run_id = format!("jr_{:04}", state.workflow_runs.len() + 1);
        state.workflow_runs.insert(
            0,
            WorkflowRunDescription {
                workflow_name: workflow_name.to_string(),
                run_id: run_id.clone(),
                status: WorkflowRunStatus::Running,
                started_on: Some(Utc::now()),
                completed_on: None,
                error_message: None,
            },
        );
        Ok(StartedWorkflowRun { run_id })
    }

    async fn get_workflow_run(
        &self,
        workflow_name: &str,
        run_id: &str,
    ) -> Result<WorkflowRunDescription> {
        self.enter("get_workflow_run", run_id)?;
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let run = state
            .workflow_runs
            .iter_mut()
            .find(|r| r.workflow_name == workflow_name && r.run_id == run_id)
            .ok_or_else(|| ClientError::NotFound(run_id.to_string()))?;

        if let Some(script) = state.workflow_script.as_mut() {
            run.status = script.next(run.status);
            if run.status == WorkflowRunStatus::Error {
                run.error_message = Some("job script raised an exception".to_string());
            }
        }

        let run = run.clone();
        if run.status == WorkflowRunStatus::Completed {
            if let Some(key) = state.workflow_output.clone() {
                state.objects.insert(key, b"25.5,68.2".to_vec());
            }
        }

        Ok(run)
    }

    async fn list_workflow_runs(
        &self,
        workflow_name: &str,
        max_results: u32,
    ) -> Result<Vec<WorkflowRunDescription>> {
        self.enter("list_workflow_runs", workflow_name)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .workflow_runs
            .iter()
            .filter(|r| r.workflow_name == workflow_name)
            .take(max_results as usize)
            .cloned()
            .collect())
    }
}
