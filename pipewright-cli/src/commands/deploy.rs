//! Deployment command handlers
//!
//! Deploys a model artifact and checks on resources it created.

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::*;
use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::ResourceRecord;
use pipewright_orchestrator::scheduler::PollPolicy;
use pipewright_orchestrator::service::{DeploymentStage, TrainingStage, WorkflowStage};
use pipewright_orchestrator::{CancelToken, PipelineConfig};
use std::sync::Arc;
use std::time::Duration;

use super::{Completion, colorize_status, settle};

#[derive(Args)]
pub struct DeployArgs {
    /// Model artifact location (e.g. s3://bucket/model-artifacts/.../model.tar.gz)
    artifact_location: String,
}

#[derive(Args)]
pub struct CheckStatusArgs {
    /// Resource name (for workflows, the workflow name)
    name: String,

    #[arg(long, value_enum, default_value = "endpoint")]
    kind: StatusKind,

    /// Keep polling an endpoint for up to this many minutes
    #[arg(long)]
    wait: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusKind {
    Endpoint,
    Training,
    Workflow,
}

/// Deploy a model artifact
pub async fn deploy_model(
    args: DeployArgs,
    client: Arc<dyn ControlPlane>,
    config: PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    let stage = DeploymentStage::new(client, Arc::new(config), cancel.clone());

    println!(
        "{} Deploying {}",
        "▸".cyan(),
        args.artifact_location.dimmed()
    );

    match stage.run(&args.artifact_location).await {
        Ok(deployed) => {
            println!("{}", "✓ Endpoint deployed".green().bold());
            print_record(&deployed.model);
            print_record(&deployed.endpoint_config);
            print_record(&deployed.endpoint);
            Ok(Completion::Done)
        }
        Err(e) => settle(e),
    }
}

/// Show or wait for a resource's status
pub async fn check_status(
    args: CheckStatusArgs,
    client: Arc<dyn ControlPlane>,
    config: PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    match args.kind {
        StatusKind::Endpoint => check_endpoint(&args, client, config, cancel).await,
        StatusKind::Training => {
            reject_wait(&args)?;
            let stage = TrainingStage::new(client, Arc::new(config), cancel.clone());
            let job = match stage.describe(&args.name).await {
                Ok(job) => job,
                Err(e) => return settle(e),
            };

            println!("{}", "Training Job:".bold());
            println!("  Name:     {}", job.name.cyan());
            println!("  Status:   {}", colorize_status(&job.status.to_string()));
            if let Some(location) = &job.artifact_location {
                println!("  Artifact: {}", location);
            }
            if let Some(reason) = &job.failure_reason {
                println!("  Reason:   {}", reason.red());
            }
            Ok(Completion::Done)
        }
        StatusKind::Workflow => {
            reject_wait(&args)?;
            let stage = WorkflowStage::new(client, &config, cancel.clone());
            match stage.latest(&args.name).await {
                Ok(Some(run)) => {
                    println!("{}", "Workflow Run:".bold());
                    println!("  Workflow: {}", run.workflow_name.cyan());
                    println!("  Run:      {}", run.run_id.dimmed());
                    println!("  Status:   {}", colorize_status(&run.status.to_string()));
                    if let Some(error) = &run.error_message {
                        println!("  Error:    {}", error.red());
                    }
                    Ok(Completion::Done)
                }
                Ok(None) => {
                    println!("{}", format!("No runs found for {}.", args.name).yellow());
                    Ok(Completion::Done)
                }
                Err(e) => settle(e),
            }
        }
    }
}

async fn check_endpoint(
    args: &CheckStatusArgs,
    client: Arc<dyn ControlPlane>,
    config: PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    let poll_interval = config.poll_interval;
    let transient_retries = config.transient_retries;
    let stage = DeploymentStage::new(client, Arc::new(config), cancel.clone());

    let Some(minutes) = args.wait else {
        let endpoint = match stage.describe(&args.name).await {
            Ok(endpoint) => endpoint,
            Err(e) => return settle(e),
        };

        println!("{}", "Endpoint:".bold());
        println!("  Name:     {}", endpoint.name.cyan());
        println!("  Status:   {}", colorize_status(&endpoint.status.to_string()));
        if let Some(config_name) = &endpoint.config_name {
            println!("  Config:   {}", config_name.dimmed());
        }
        if let Some(created) = endpoint.created_at {
            println!("  Created:  {}", created.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(reason) = &endpoint.failure_reason {
            println!("  Reason:   {}", reason.red());
        }
        return Ok(Completion::Done);
    };

    println!(
        "{} Waiting up to {} minute(s) for {}",
        "▸".cyan(),
        minutes,
        args.name.cyan()
    );
    let policy = wait_policy(poll_interval, transient_retries, minutes);

    match stage.await_endpoint(&args.name, policy).await {
        Ok(record) => {
            println!("{}", "✓ Endpoint is in service".green().bold());
            print_record(&record);
            Ok(Completion::Done)
        }
        Err(e) => settle(e),
    }
}

/// Wall-clock policy for `--wait`, saturating on huge minute counts
fn wait_policy(poll_interval: Duration, transient_retries: u32, minutes: u64) -> PollPolicy {
    let max_wait = Duration::from_secs(minutes.saturating_mul(60));
    PollPolicy::elapsed(poll_interval, max_wait).with_transient_retries(transient_retries)
}

fn reject_wait(args: &CheckStatusArgs) -> Result<()> {
    if args.wait.is_some() {
        anyhow::bail!("--wait is only supported for endpoints");
    }
    Ok(())
}

fn print_record(record: &ResourceRecord) {
    let status = record
        .status
        .as_deref()
        .map(colorize_status)
        .unwrap_or_else(|| "created".dimmed());
    println!(
        "  {} {:<15} {} {}",
        "▸".cyan(),
        record.kind().to_string(),
        record.name(),
        status
    );
}
