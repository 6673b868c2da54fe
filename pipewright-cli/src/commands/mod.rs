//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod cleanup;
mod deploy;
mod endpoint;
mod pipeline;
mod training;

pub use cleanup::CleanupArgs;
pub use deploy::{CheckStatusArgs, DeployArgs};
pub use endpoint::TestEndpointArgs;
pub use pipeline::{RunPipelineArgs, StatusArgs};
pub use training::{RunWorkflowArgs, TrainArgs};

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use pipewright_client::{ControlPlane, ControlPlaneClient};
use pipewright_core::domain::resource::ResourceKind;
use pipewright_orchestrator::{CancelToken, StageError};
use std::sync::Arc;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline: data check, workflow, training, deployment, test
    RunPipeline(RunPipelineArgs),
    /// Deploy a trained model artifact to a new endpoint
    DeployModel(DeployArgs),
    /// Show (or wait for) the status of a resource
    CheckStatus(CheckStatusArgs),
    /// Delete failed endpoints and their configs and models
    Cleanup(CleanupArgs),
    /// Send the sample feature vectors to an endpoint
    TestEndpoint(TestEndpointArgs),
    /// Train a model on the configured training data
    Train(TrainArgs),
    /// Run the ETL workflow and wait for it
    RunWorkflow(RunWorkflowArgs),
    /// Summarize data, artifacts and resources
    Status(StatusArgs),
}

/// How a command ended when it did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    /// A wait ran out; the resource may still settle
    TimedOut,
    Interrupted,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
/// * `cancel` - Cancelled when the user interrupts the process
pub async fn handle_command(
    command: Commands,
    config: &Config,
    cancel: &CancelToken,
) -> Result<Completion> {
    let pipeline_config = config.pipeline()?;
    let client: Arc<dyn ControlPlane> =
        Arc::new(ControlPlaneClient::new(pipeline_config.control_plane_url.clone()));

    match command {
        Commands::RunPipeline(args) => {
            pipeline::run_pipeline(args, client, pipeline_config, cancel).await
        }
        Commands::DeployModel(args) => deploy::deploy_model(args, client, pipeline_config, cancel).await,
        Commands::CheckStatus(args) => deploy::check_status(args, client, pipeline_config, cancel).await,
        Commands::Cleanup(args) => cleanup::cleanup(args, client, &pipeline_config, cancel).await,
        Commands::TestEndpoint(args) => {
            endpoint::test_endpoint(args, client, &pipeline_config, cancel).await
        }
        Commands::Train(args) => training::train(args, client, pipeline_config, cancel).await,
        Commands::RunWorkflow(args) => {
            training::run_workflow(args, client, &pipeline_config, cancel).await
        }
        Commands::Status(args) => pipeline::status(args, client, &pipeline_config).await,
    }
}

/// Turns a stage error into an exit status, printing what happened
///
/// Timeouts and interrupts are reported but are not errors.
fn settle(err: StageError) -> Result<Completion> {
    match err {
        StageError::TimedOut { record } => {
            println!(
                "{} {} did not settle in time (last status: {})",
                "⏱".yellow(),
                record.name().cyan(),
                record.status.as_deref().unwrap_or("unknown")
            );
            if record.kind() == ResourceKind::Endpoint {
                println!(
                    "  {}",
                    format!(
                        "Check again later: pipewright check-status {} --wait 15",
                        record.name()
                    )
                    .dimmed()
                );
            }
            Ok(Completion::TimedOut)
        }
        StageError::Cancelled => {
            println!("{}", "Interrupted.".yellow());
            Ok(Completion::Interrupted)
        }
        other => Err(other.into()),
    }
}

/// Colorize a control-plane status string for display
fn colorize_status(status: &str) -> ColoredString {
    match status {
        "InService" | "Completed" | "Succeeded" => status.green(),
        "Failed" | "OutOfService" | "Stopped" | "Error" => status.red(),
        "Creating" | "Updating" | "SystemUpdating" | "RollingBack" | "InProgress" | "Running"
        | "Starting" | "Stopping" => status.yellow(),
        _ => status.dimmed(),
    }
}
