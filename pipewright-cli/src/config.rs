//! Configuration module
//!
//! Layers the global CLI flags (each backed by a `PIPEWRIGHT_*` variable)
//! over the orchestrator's pipeline configuration.

use anyhow::{Context, Result};
use pipewright_orchestrator::PipelineConfig;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the control-plane gateway
    pub control_plane_url: String,
    pub data_bucket: String,
    pub role_arn: String,
    pub region: String,
    /// Seconds between status polls
    pub poll_interval: u64,
}

impl Config {
    /// Builds the validated pipeline configuration
    pub fn pipeline(&self) -> Result<PipelineConfig> {
        let config = PipelineConfig::new(
            self.control_plane_url.clone(),
            self.data_bucket.clone(),
            self.role_arn.clone(),
        )
        .with_region(self.region.clone())
        .with_env_overrides()
        .context("Failed to read pipeline settings from environment")?
        .with_poll_interval(Duration::from_secs(self.poll_interval));

        config.validate().context("Invalid pipeline configuration")?;
        Ok(config)
    }
}
