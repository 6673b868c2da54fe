mod common;

use chrono::Duration;
use common::{ARTIFACT, InMemoryControlPlane, test_config};
use pipewright_client::ControlPlane;
use pipewright_core::domain::run::RunOutcome;
use pipewright_core::domain::status::{EndpointStatus, TrainingJobStatus, WorkflowRunStatus};
use pipewright_orchestrator::{CancelToken, FreshnessPolicy, PipelineConfig, PipelineOrchestrator};
use std::sync::Arc;

fn orchestrator(plane: &Arc<InMemoryControlPlane>, config: PipelineConfig) -> PipelineOrchestrator {
    let client: Arc<dyn ControlPlane> = plane.clone();
    PipelineOrchestrator::new(client, config, CancelToken::new())
}

fn trainable_plane() -> Arc<InMemoryControlPlane> {
    let plane = Arc::new(InMemoryControlPlane::with_training_data());
    plane.script_training(
        vec![TrainingJobStatus::InProgress, TrainingJobStatus::Completed],
        Some(ARTIFACT),
    );
    plane
}

#[tokio::test(start_paused = true)]
async fn test_full_run_succeeds() {
    let plane = trainable_plane();
    plane.script_endpoint(
        vec![EndpointStatus::Creating, EndpointStatus::InService],
        None,
    );

    let report = orchestrator(&plane, test_config()).run().await;

    assert_eq!(report.outcome, RunOutcome::Succeeded);
    assert_eq!(report.artifact_location.as_deref(), Some(ARTIFACT));
    assert!(!report.training_reused);
    assert!(!report.endpoint_reused);
    assert_eq!(report.sample_prediction, Some(26.4));
    assert_eq!(report.resources().len(), 4);
    assert_eq!(
        report.endpoint.as_ref().and_then(|e| e.status.as_deref()),
        Some("InService")
    );
    assert_eq!(report.invocation.as_ref().unwrap().results.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_endpoint_timeout_is_not_a_failure() {
    let plane = trainable_plane();
    plane.script_endpoint(vec![EndpointStatus::Creating; 21], None);

    let report = orchestrator(&plane, test_config()).run().await;

    let endpoint = report.endpoint.as_ref().unwrap();
    assert_eq!(
        report.outcome,
        RunOutcome::TimedOut {
            resource: endpoint.name().to_string()
        }
    );
    assert_eq!(endpoint.status.as_deref(), Some("Creating"));
    assert!(report.invocation.is_none());
    assert_eq!(report.sample_prediction, None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_endpoint_fails_the_run() {
    let plane = trainable_plane();
    plane.script_endpoint(
        vec![EndpointStatus::Creating, EndpointStatus::Failed],
        Some("OutOfCapacity"),
    );

    let report = orchestrator(&plane, test_config()).run().await;

    match &report.outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("OutOfCapacity")),
        other => panic!("expected failure, got {other:?}"),
    }
    let endpoint = report.endpoint.as_ref().unwrap();
    assert_eq!(endpoint.failure_reason.as_deref(), Some("OutOfCapacity"));
    // Left in place for cleanup
    assert!(plane.has_endpoint(endpoint.name()));
    assert!(plane.has_model(report.model.as_ref().unwrap().name()));
}

#[tokio::test(start_paused = true)]
async fn test_missing_training_data_fails_before_training() {
    let plane = Arc::new(InMemoryControlPlane::new());

    let report = orchestrator(&plane, test_config()).run().await;

    assert!(matches!(report.outcome, RunOutcome::Failed { .. }));
    assert!(report.resources().is_empty());
    assert_eq!(plane.count("create_training_job"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unhealthy_endpoint_fails_the_run() {
    let plane = trainable_plane();
    plane.script_endpoint(vec![EndpointStatus::InService], None);
    plane.script_invocations(vec![
        Err((400, "bad input")),
        Err((400, "bad input")),
        Err((400, "bad input")),
        Ok("26.0"),
        Ok("27.0"),
    ]);

    let report = orchestrator(&plane, test_config()).run().await;

    assert!(matches!(report.outcome, RunOutcome::Failed { .. }));
    assert_eq!(report.sample_prediction, None);
}

#[tokio::test(start_paused = true)]
async fn test_reuses_fresh_model_and_active_endpoint() {
    let plane = Arc::new(InMemoryControlPlane::with_training_data());
    plane.seed_training_job(
        "sensor-prediction-training-20250805-124642",
        TrainingJobStatus::Completed,
        Duration::hours(2),
        Some(ARTIFACT),
    );
    plane.seed_endpoint(
        "sensor-prediction-endpoint-20250805-130217",
        EndpointStatus::InService,
        None,
    );
    let config = test_config().with_freshness(FreshnessPolicy::MaxAge(Duration::hours(24)));

    let report = orchestrator(&plane, config).run().await;

    assert_eq!(report.outcome, RunOutcome::Succeeded);
    assert!(report.training_reused);
    assert!(report.endpoint_reused);
    assert_eq!(plane.count("create_training_job"), 0);
    assert_eq!(plane.count("create_model"), 0);
    assert_eq!(plane.count("create_endpoint"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_workflow_runs_before_training() {
    let plane = trainable_plane();
    plane.script_endpoint(vec![EndpointStatus::InService], None);
    plane.script_workflow(vec![WorkflowRunStatus::Running, WorkflowRunStatus::Completed]);
    let config = test_config().with_workflow("sensor-data-etl");

    let report = orchestrator(&plane, config).run().await;

    assert_eq!(report.outcome, RunOutcome::Succeeded);
    assert_eq!(
        report.workflow_run.as_ref().and_then(|r| r.status.as_deref()),
        Some("Completed")
    );

    let calls = plane.calls();
    let workflow = calls.iter().position(|c| c.starts_with("start_workflow_run"));
    let training = calls.iter().position(|c| c.starts_with("create_training_job"));
    assert!(workflow.unwrap() < training.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_workflow_fills_empty_bucket_before_data_check() {
    let plane = Arc::new(InMemoryControlPlane::new());
    plane.workflow_writes_training_data();
    plane.script_workflow(vec![WorkflowRunStatus::Running, WorkflowRunStatus::Completed]);
    plane.script_training(
        vec![TrainingJobStatus::InProgress, TrainingJobStatus::Completed],
        Some(ARTIFACT),
    );
    plane.script_endpoint(vec![EndpointStatus::InService], None);
    let config = test_config().with_workflow("sensor-data-etl");

    let report = orchestrator(&plane, config).run().await;

    assert_eq!(report.outcome, RunOutcome::Succeeded);
    assert_eq!(plane.count("start_workflow_run"), 1);

    let calls = plane.calls();
    let workflow = calls.iter().position(|c| c.starts_with("start_workflow_run"));
    let data_check = calls.iter().position(|c| c.starts_with("list_objects"));
    assert!(workflow.unwrap() < data_check.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_workflow_without_output_fails_data_check() {
    let plane = Arc::new(InMemoryControlPlane::new());
    plane.script_workflow(vec![WorkflowRunStatus::Completed]);
    let config = test_config().with_workflow("sensor-data-etl");

    let report = orchestrator(&plane, config).run().await;

    match &report.outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("no training data")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(plane.count("start_workflow_run"), 1);
    assert!(report.workflow_run.is_some());
    assert_eq!(plane.count("create_training_job"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_training_job_is_reported() {
    let plane = Arc::new(InMemoryControlPlane::with_training_data());
    plane.script_training(
        vec![TrainingJobStatus::InProgress, TrainingJobStatus::Failed],
        None,
    );
    plane.script_training_failure("AlgorithmError: label column missing");

    let report = orchestrator(&plane, test_config()).run().await;

    assert!(matches!(report.outcome, RunOutcome::Failed { .. }));
    let job = report.training_job.as_ref().unwrap();
    assert!(job.name().starts_with("sensor-prediction-training"));
    assert_eq!(job.status.as_deref(), Some("Failed"));
    assert_eq!(
        job.failure_reason.as_deref(),
        Some("AlgorithmError: label column missing")
    );
    assert_eq!(report.artifact_location, None);
    assert_eq!(report.resources().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_training_without_artifact_is_reported() {
    let plane = Arc::new(InMemoryControlPlane::with_training_data());
    plane.script_training(vec![TrainingJobStatus::Completed], None);

    let report = orchestrator(&plane, test_config()).run().await;

    assert!(matches!(report.outcome, RunOutcome::Failed { .. }));
    assert!(report.training_job.is_some());
    assert_eq!(plane.count("create_model"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_workflow_stops_the_run() {
    let plane = trainable_plane();
    plane.script_workflow(vec![WorkflowRunStatus::Running, WorkflowRunStatus::Error]);
    let config = test_config().with_workflow("sensor-data-etl");

    let report = orchestrator(&plane, config).run().await;

    match &report.outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("exception")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        report.workflow_run.as_ref().and_then(|r| r.status.as_deref()),
        Some("Error")
    );
    assert_eq!(plane.count("create_training_job"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run() {
    let plane = trainable_plane();
    let cancel = CancelToken::new();
    cancel.cancel();
    let client: Arc<dyn ControlPlane> = plane.clone();

    let report = PipelineOrchestrator::new(client, test_config(), cancel)
        .run()
        .await;

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert!(plane.calls().is_empty());
}
