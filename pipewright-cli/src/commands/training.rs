//! Training and workflow command handlers

use anyhow::Result;
use clap::Args;
use colored::*;
use pipewright_client::ControlPlane;
use pipewright_orchestrator::service::{TrainingStage, WorkflowStage};
use pipewright_orchestrator::{CancelToken, FreshnessPolicy, PipelineConfig};
use std::sync::Arc;

use super::{Completion, settle};

#[derive(Args)]
pub struct TrainArgs {
    /// Reuse a completed training job instead: "any" or a maximum age in hours
    #[arg(long)]
    reuse: Option<String>,
}

#[derive(Args)]
pub struct RunWorkflowArgs {
    /// Workflow to run (defaults to PIPEWRIGHT_WORKFLOW_NAME)
    name: Option<String>,
}

/// Train a model, or report a reusable one
pub async fn train(
    args: TrainArgs,
    client: Arc<dyn ControlPlane>,
    config: PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    let input = config.training_data();
    let stage = TrainingStage::new(client, Arc::new(config), cancel.clone());

    if let Some(reuse) = args.reuse {
        let freshness = FreshnessPolicy::parse(&reuse)?;
        match stage.find_reusable(freshness).await {
            Ok(Some(model)) => {
                println!(
                    "{} Reusing {}",
                    "✓".green(),
                    model.record.name().cyan()
                );
                println!("  Artifact: {}", model.artifact_location);
                return Ok(Completion::Done);
            }
            Ok(None) => println!("{}", "No reusable training job, training a new model.".yellow()),
            Err(e) => return settle(e),
        }
    }

    println!("{} Training on {}", "▸".cyan(), input.to_string().dimmed());
    match stage.run(&input).await {
        Ok(model) => {
            println!(
                "{} Training job {} completed",
                "✓".green(),
                model.record.name().cyan()
            );
            println!("  Artifact: {}", model.artifact_location);
            println!(
                "  {}",
                format!("Deploy with: pipewright deploy-model {}", model.artifact_location).dimmed()
            );
            Ok(Completion::Done)
        }
        Err(e) => settle(e),
    }
}

/// Run the ETL workflow to completion
pub async fn run_workflow(
    args: RunWorkflowArgs,
    client: Arc<dyn ControlPlane>,
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    let Some(name) = args.name.or_else(|| config.workflow_name.clone()) else {
        anyhow::bail!("no workflow given and PIPEWRIGHT_WORKFLOW_NAME is not set");
    };

    let stage = WorkflowStage::new(client, config, cancel.clone());

    println!("{} Running workflow {}", "▸".cyan(), name.cyan());
    match stage.run(&name).await {
        Ok(record) => {
            println!(
                "{} Workflow run {} completed",
                "✓".green(),
                record.name().dimmed()
            );
            Ok(Completion::Done)
        }
        Err(e) => settle(e),
    }
}
