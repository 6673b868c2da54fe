//! Endpoint test command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use pipewright_client::ControlPlane;
use pipewright_core::domain::prediction::InvocationReport;
use pipewright_orchestrator::service::InvocationTestStage;
use pipewright_orchestrator::{CancelToken, PipelineConfig};
use std::sync::Arc;

use super::{Completion, settle};

#[derive(Args)]
pub struct TestEndpointArgs {
    /// Endpoint to invoke
    endpoint_name: String,
}

/// Invoke an endpoint with the configured samples
pub async fn test_endpoint(
    args: TestEndpointArgs,
    client: Arc<dyn ControlPlane>,
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> Result<Completion> {
    let stage = InvocationTestStage::new(client, config, cancel.clone());

    let report = match stage.run(&args.endpoint_name, &config.samples).await {
        Ok(report) => report,
        Err(e) => return settle(e),
    };

    print_report(&report);

    if !report.is_operational() {
        anyhow::bail!(
            "endpoint {} answered only {}/{} sample(s)",
            report.endpoint_name,
            report.succeeded(),
            report.results.len()
        );
    }
    Ok(Completion::Done)
}

fn print_report(report: &InvocationReport) {
    println!(
        "{}",
        format!("Invocation test for {}:", report.endpoint_name).bold()
    );

    for (idx, result) in report.results.iter().enumerate() {
        match result {
            Ok(prediction) => {
                let input = prediction
                    .input_primary
                    .map(|v| format!("{:.1}", v))
                    .unwrap_or_else(|| "-".to_string());
                let trend = prediction
                    .trend
                    .map(|t| format!(" ({}, {:+.2})", t, prediction.delta.unwrap_or_default()))
                    .unwrap_or_default();

                println!(
                    "  {} Sample {}: {} → {}{}",
                    "✓".green(),
                    idx + 1,
                    input,
                    format!("{:.2}", prediction.value).cyan(),
                    trend.dimmed()
                );
                for warning in &prediction.warnings {
                    println!("      {} {}", "⚠".yellow(), warning.to_string().yellow());
                }
            }
            Err(e) => println!(
                "  {} Sample {}: {}",
                "✗".red(),
                idx + 1,
                e.to_string().red()
            ),
        }
    }

    println!();
    let summary = format!(
        "{}/{} sample(s) succeeded",
        report.succeeded(),
        report.results.len()
    );
    if report.is_operational() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}
