//! Pipeline command handlers
//!
//! Runs the end-to-end pipeline and prints the overall status report.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::ResourceRecord;
use pipewright_core::domain::run::{RunOutcome, RunReport};
use pipewright_orchestrator::service::{PipelineStatus, Section};
use pipewright_orchestrator::{CancelToken, FreshnessPolicy, PipelineConfig, PipelineOrchestrator};
use std::sync::Arc;

use super::{Completion, colorize_status};

#[derive(Args)]
pub struct RunPipelineArgs {
    /// Run this ETL workflow before training
    #[arg(long)]
    workflow: Option<String>,

    /// Reuse a completed training job: "never", "any" or a maximum age in hours
    #[arg(long)]
    freshness: Option<String>,

    /// Always deploy a new endpoint, even when the model was reused
    #[arg(long)]
    no_endpoint_reuse: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Items listed per resource type
    #[arg(long, default_value = "5")]
    recent: u32,

    /// Endpoints older than this many days are listed as stale
    #[arg(long, default_value = "7")]
    stale_days: u32,
}

/// Run the full pipeline
pub async fn run_pipeline(
    args: RunPipelineArgs,
    client: Arc<dyn ControlPlane>,
    mut config: PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    if let Some(workflow) = args.workflow {
        config = config.with_workflow(workflow);
    }
    if let Some(freshness) = args.freshness {
        config = config.with_freshness(FreshnessPolicy::parse(&freshness)?);
    }
    if args.no_endpoint_reuse {
        config.reuse_active_endpoint = false;
    }

    let report = PipelineOrchestrator::new(client, config, cancel.clone())
        .run()
        .await;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_run_report(&report);
    }

    match report.outcome {
        RunOutcome::Succeeded => Ok(Completion::Done),
        RunOutcome::TimedOut { .. } => Ok(Completion::TimedOut),
        RunOutcome::Cancelled => Ok(Completion::Interrupted),
        RunOutcome::Failed { reason } => Err(anyhow::anyhow!("pipeline failed: {}", reason)),
    }
}

/// Print the status report
pub async fn status(
    args: StatusArgs,
    client: Arc<dyn ControlPlane>,
    config: &PipelineConfig,
) -> Result<Completion> {
    let config = config.clone().with_stale_after_days(args.stale_days)?;
    let status = PipelineStatus::collect(&*client, &config, args.recent).await;

    println!("{}", "Pipeline Status".bold());
    println!("{}", "─".repeat(60).dimmed());

    if let Some(workflow) = &status.workflow {
        println!("{}", "ETL workflow:".bold());
        match workflow {
            Ok(Some(run)) => {
                println!(
                    "  {} {}",
                    run.run_id.dimmed(),
                    colorize_status(&run.status.to_string())
                );
                if let Some(error) = &run.error_message {
                    println!("  {}", error.red());
                }
            }
            Ok(None) => println!("  {}", "No runs yet.".yellow()),
            Err(e) => print_section_error(e),
        }
        println!();
    }

    println!("{}", "Data:".bold());
    for (prefix, count) in &status.data {
        match count {
            Ok(count) => println!("  {:<12} {} object(s)", prefix.cyan(), count),
            Err(e) => println!("  {:<12} {}", prefix.cyan(), e.red()),
        }
    }
    println!();

    print_section("Model artifacts:", &status.artifacts, |a| {
        format!("{} ({} bytes)", a.key.cyan(), a.size)
    });
    print_section("Training jobs:", &status.training_jobs, |j| {
        format!("{} {}", j.name.cyan(), colorize_status(&j.status.to_string()))
    });
    print_section("Models:", &status.models, |m| {
        format!(
            "{} {}",
            m.name.cyan(),
            m.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        )
    });
    print_section("Endpoints:", &status.endpoints, |e| {
        format!("{} {}", e.name.cyan(), colorize_status(&e.status.to_string()))
    });
    print_section(
        &format!("Endpoints older than {} day(s):", args.stale_days),
        &status.stale_endpoints,
        |e| {
            format!(
                "{} {}",
                e.name.cyan(),
                e.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
            )
        },
    );

    Ok(Completion::Done)
}

fn print_section<T>(title: &str, section: &Section<Vec<T>>, line: impl Fn(&T) -> String) {
    println!("{}", title.bold());
    match section {
        Ok(items) if items.is_empty() => println!("  {}", "None found.".yellow()),
        Ok(items) => {
            for item in items {
                println!("  {} {}", "▸".cyan(), line(item));
            }
        }
        Err(e) => print_section_error(e),
    }
    println!();
}

fn print_section_error(error: &str) {
    println!("  {} {}", "✗".red(), error.red());
}

fn print_run_report(report: &RunReport) {
    println!();
    println!("{}", "Pipeline Run:".bold());
    println!("  ID:       {}", report.id.to_string().cyan());
    println!("  Outcome:  {}", colorize_outcome(&report.outcome));
    println!(
        "  Duration: {}s",
        report
            .finished_at
            .signed_duration_since(report.started_at)
            .num_seconds()
    );

    let resources = report.resources();
    if !resources.is_empty() {
        println!("\n{}", "Resources:".bold());
        for record in resources {
            print_record(record, reused_marker(report, record));
        }
    }

    if let Some(location) = &report.artifact_location {
        println!("\n{}", "Model artifact:".bold());
        println!("  {}", location);
    }

    if let Some(invocation) = &report.invocation {
        println!("\n{}", "Invocation test:".bold());
        println!(
            "  {}/{} sample(s) succeeded",
            invocation.succeeded(),
            invocation.results.len()
        );
    }

    if let Some(prediction) = report.sample_prediction {
        println!("  Sample prediction: {}", format!("{:.2}", prediction).green());
    }
}

fn reused_marker(report: &RunReport, record: &ResourceRecord) -> bool {
    let same = |other: &Option<ResourceRecord>| other.as_ref() == Some(record);
    (report.training_reused && same(&report.training_job))
        || (report.endpoint_reused && same(&report.endpoint))
}

fn print_record(record: &ResourceRecord, reused: bool) {
    let status = record
        .status
        .as_deref()
        .map(colorize_status)
        .unwrap_or_else(|| "created".dimmed());

    println!(
        "  {} {:<15} {} {}{}",
        "▸".cyan(),
        record.kind().to_string(),
        record.name(),
        status,
        if reused { " (reused)".dimmed() } else { "".normal() }
    );

    if let Some(reason) = &record.failure_reason {
        println!("    {}", reason.red());
    }
}

fn colorize_outcome(outcome: &RunOutcome) -> ColoredString {
    let text = outcome.to_string();
    match outcome {
        RunOutcome::Succeeded => text.green(),
        RunOutcome::Failed { .. } => text.red(),
        RunOutcome::TimedOut { .. } => text.yellow(),
        RunOutcome::Cancelled => text.dimmed(),
    }
}
