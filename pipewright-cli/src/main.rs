//! Pipewright CLI
//!
//! Command-line interface for running and inspecting the ML serving
//! pipeline: train, deploy, test, check status and clean up.

mod commands;
mod config;

use clap::Parser;
use colored::*;
use commands::{Commands, Completion, handle_command};
use config::Config;
use pipewright_orchestrator::CancelToken;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pipewright")]
#[command(about = "ML serving pipeline orchestrator", long_about = None)]
struct Cli {
    /// Control-plane gateway URL
    #[arg(
        long,
        global = true,
        env = "PIPEWRIGHT_CONTROL_PLANE_URL",
        default_value = "http://localhost:4566"
    )]
    control_plane_url: String,

    /// Bucket holding pipeline data and model artifacts
    #[arg(
        long,
        global = true,
        env = "PIPEWRIGHT_DATA_BUCKET",
        default_value = "sagemaker-ml-pipeline-data"
    )]
    bucket: String,

    /// Execution role passed to the training and inference services
    #[arg(
        long,
        global = true,
        env = "PIPEWRIGHT_ROLE_ARN",
        default_value = "arn:aws:iam::000000000000:role/sagemaker-ml-pipeline-sagemaker-role"
    )]
    role_arn: String,

    #[arg(long, global = true, env = "PIPEWRIGHT_REGION", default_value = "us-east-1")]
    region: String,

    /// Seconds between status polls
    #[arg(long, global = true, env = "PIPEWRIGHT_POLL_INTERVAL", default_value = "30")]
    poll_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; command output stays on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipewright_orchestrator=info,pipewright_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        control_plane_url: cli.control_plane_url,
        data_bucket: cli.bucket,
        role_arn: cli.role_arn,
        region: cli.region,
        poll_interval: cli.poll_interval,
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current call");
                cancel.cancel();
            }
        });
    }

    match handle_command(cli.command, &config, &cancel).await {
        Ok(Completion::Done) => ExitCode::SUCCESS,
        Ok(Completion::TimedOut) => ExitCode::from(2),
        Ok(Completion::Interrupted) => ExitCode::from(130),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
