//! Cleanup command handler

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::ResourceKind;
use pipewright_orchestrator::service::{Candidate, CleanupAction, CleanupAgent, CleanupReport};
use pipewright_orchestrator::scheduler::PollError;
use pipewright_orchestrator::{CancelToken, PipelineConfig};
use std::sync::Arc;

use super::Completion;

/// Without any explicit resource, failed endpoints of this pipeline are
/// discovered and swept together with their configs and models.
#[derive(Args)]
pub struct CleanupArgs {
    /// Endpoint to delete if it is failed or out of service
    #[arg(long)]
    endpoint: Vec<String>,

    /// Endpoint config to delete
    #[arg(long)]
    config: Vec<String>,

    /// Model to delete
    #[arg(long)]
    model: Vec<String>,
}

/// Sweep candidates and print what happened to each
pub async fn cleanup(
    args: CleanupArgs,
    client: Arc<dyn ControlPlane>,
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    let agent = CleanupAgent::new(client, config, cancel.clone());

    let mut candidates: Vec<Candidate> = Vec::new();
    candidates.extend(args.endpoint.into_iter().map(|n| Candidate::new(ResourceKind::Endpoint, n)));
    candidates.extend(
        args.config
            .into_iter()
            .map(|n| Candidate::new(ResourceKind::EndpointConfig, n)),
    );
    candidates.extend(args.model.into_iter().map(|n| Candidate::new(ResourceKind::Model, n)));

    if candidates.is_empty() {
        candidates = match agent.discover_failed().await {
            Ok(candidates) => candidates,
            Err(PollError::Cancelled) => return Ok(Completion::Interrupted),
            Err(e) => return Err(e).context("Failed to list endpoints"),
        };

        if candidates.is_empty() {
            println!("{}", "No failed endpoints found.".green());
            return Ok(Completion::Done);
        }
    }

    println!(
        "{}",
        format!("Cleaning up {} resource(s):", candidates.len()).bold()
    );
    let report = agent.sweep(&candidates).await;
    print_report(&report);

    if report.interrupted() || cancel.is_cancelled() {
        return Ok(Completion::Interrupted);
    }
    if report.failures() > 0 {
        anyhow::bail!("{} resource(s) could not be cleaned up", report.failures());
    }
    Ok(Completion::Done)
}

fn print_report(report: &CleanupReport) {
    for entry in &report.entries {
        let action = match &entry.action {
            CleanupAction::Deleted => "deleted".green(),
            CleanupAction::AlreadyAbsent => "already absent".dimmed(),
            CleanupAction::Skipped { reason } => format!("skipped ({})", reason).yellow(),
            CleanupAction::Failed { error } => format!("failed: {}", error).red(),
            CleanupAction::Cancelled => "cancelled".dimmed(),
        };
        println!(
            "  {} {:<15} {} {}",
            "▸".cyan(),
            entry.candidate.kind.to_string(),
            entry.candidate.name,
            action
        );
    }

    println!();
    println!(
        "{} deleted, {} already absent, {} failed",
        report.deleted().to_string().green(),
        report.already_absent(),
        report.failures().to_string().red()
    );
}
