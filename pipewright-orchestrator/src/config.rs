//! Pipeline configuration
//!
//! Defines every parameter the orchestrator needs: control-plane location,
//! buckets and roles, compute choices, polling ceilings and plausibility
//! bounds. The value is built once and passed into the orchestrator; there is
//! no process-wide configuration state.

use chrono::Duration as AgeLimit;
use pipewright_core::domain::prediction::FeatureVector;
use pipewright_core::domain::resource::DataLocation;
use pipewright_core::dto::Tag;
use std::collections::BTreeMap;
use std::time::Duration;

/// Reference XGBoost serving/training images by region
const CONTAINER_IMAGES: &[(&str, &str)] = &[
    (
        "us-east-1",
        "683313688378.dkr.ecr.us-east-1.amazonaws.com/sagemaker-xgboost:1.7-1",
    ),
    (
        "us-west-2",
        "246618743249.dkr.ecr.us-west-2.amazonaws.com/sagemaker-xgboost:1.7-1",
    ),
    (
        "eu-west-1",
        "141502667606.dkr.ecr.eu-west-1.amazonaws.com/sagemaker-xgboost:1.7-1",
    ),
    (
        "ap-southeast-1",
        "121021644041.dkr.ecr.ap-southeast-1.amazonaws.com/sagemaker-xgboost:1.7-1",
    ),
];

/// Container image for a region, falling back to us-east-1
pub fn default_container_image(region: &str) -> &'static str {
    CONTAINER_IMAGES
        .iter()
        .find(|(r, _)| *r == region)
        .or_else(|| CONTAINER_IMAGES.first())
        .map(|(_, image)| *image)
        .unwrap_or_default()
}

/// Rule for reusing a previously completed training job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessPolicy {
    /// Always train a new model
    Never,
    /// Reuse the newest completed job regardless of age
    Any,
    /// Reuse the newest completed job created within this age
    MaxAge(AgeLimit),
}

impl FreshnessPolicy {
    /// Parses "never", "any" or a number of hours
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "any" => Ok(Self::Any),
            hours => {
                let hours: i64 = hours
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid freshness policy `{}`", input))?;
                if hours < 0 {
                    anyhow::bail!("freshness age cannot be negative: `{}`", input);
                }
                let age = AgeLimit::try_hours(hours)
                    .ok_or_else(|| anyhow::anyhow!("freshness age out of range: `{}`", input))?;
                Ok(Self::MaxAge(age))
            }
        }
    }
}

/// Bounds for the invocation sanity check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plausibility {
    pub min: f64,
    pub max: f64,
    /// Largest accepted |prediction - primary feature|
    pub max_delta: f64,
    /// |delta| below this is reported as a stable trend
    pub stable_band: f64,
}

impl Default for Plausibility {
    fn default() -> Self {
        Self {
            min: 5.0,
            max: 50.0,
            max_delta: 5.0,
            stable_band: 0.5,
        }
    }
}

/// Orchestrator configuration
///
/// All timeouts and intervals are configurable so the same pipeline can be
/// tuned for fast test gateways and slow production provisioning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Control-plane gateway base URL (e.g., "http://localhost:4566")
    pub control_plane_url: String,

    pub region: String,

    /// Project tag attached to every created resource
    pub project_name: String,

    /// Name prefix for generated resources (e.g., "sensor-prediction")
    pub purpose: String,

    pub data_bucket: String,

    /// Prefix that must contain at least one object before training
    pub training_prefix: String,

    /// Training data object handed to the training job
    pub training_key: String,

    /// Where the training service writes model artifacts
    pub output_path: String,

    pub role_arn: String,

    pub container_image: String,

    pub training_instance_type: String,
    pub training_instance_count: u32,
    pub training_volume_gb: u32,
    pub training_max_runtime: Duration,
    pub hyperparameters: BTreeMap<String, String>,

    pub endpoint_instance_type: String,
    pub endpoint_instance_count: u32,

    pub tags: Vec<Tag>,

    /// ETL workflow to run before training, if any
    pub workflow_name: Option<String>,

    /// Fixed delay between status polls
    pub poll_interval: Duration,

    /// Attempt ceiling for the deployment fast path
    pub deploy_max_attempts: u32,

    /// Wall-clock ceiling for the long-poll endpoint wait
    pub endpoint_max_wait: Duration,

    /// Wall-clock ceiling for workflow runs
    pub workflow_max_wait: Duration,

    /// Consecutive transient control-plane errors tolerated per call
    pub transient_retries: u32,

    pub freshness: FreshnessPolicy,

    /// Reuse the newest in-service endpoint when training was reused
    pub reuse_active_endpoint: bool,

    pub plausibility: Plausibility,

    pub samples: Vec<FeatureVector>,

    /// Endpoints older than this are listed as stale in the status report
    pub stale_endpoint_age: AgeLimit,
}

impl PipelineConfig {
    /// Creates a configuration with defaults
    pub fn new(control_plane_url: String, data_bucket: String, role_arn: String) -> Self {
        let region = "us-east-1".to_string();
        let project_name = "sagemaker-ml-pipeline".to_string();
        let output_path = format!("s3://{}/model-artifacts/", data_bucket);

        Self {
            control_plane_url,
            container_image: default_container_image(&region).to_string(),
            region,
            tags: vec![
                Tag::new("Project", project_name.clone()),
                Tag::new("Environment", "development"),
            ],
            project_name,
            purpose: "sensor-prediction".to_string(),
            data_bucket,
            training_prefix: "training/".to_string(),
            training_key: "training/realistic_training_data.csv".to_string(),
            output_path,
            role_arn,
            training_instance_type: "ml.m5.large".to_string(),
            training_instance_count: 1,
            training_volume_gb: 30,
            training_max_runtime: Duration::from_secs(3600), // 1 hour
            hyperparameters: default_hyperparameters(),
            endpoint_instance_type: "ml.t2.medium".to_string(),
            endpoint_instance_count: 1,
            workflow_name: None,
            poll_interval: Duration::from_secs(30),
            deploy_max_attempts: 20,
            endpoint_max_wait: Duration::from_secs(15 * 60),
            workflow_max_wait: Duration::from_secs(60 * 60),
            transient_retries: 3,
            freshness: FreshnessPolicy::MaxAge(AgeLimit::hours(24)),
            reuse_active_endpoint: true,
            plausibility: Plausibility::default(),
            samples: default_samples(),
            stale_endpoint_age: AgeLimit::days(7),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PIPEWRIGHT_CONTROL_PLANE_URL (required)
    /// - PIPEWRIGHT_DATA_BUCKET (required)
    /// - PIPEWRIGHT_ROLE_ARN (required)
    ///
    /// plus the optional ones read by [`Self::with_env_overrides`]:
    /// - PIPEWRIGHT_REGION (optional, default: us-east-1)
    /// - PIPEWRIGHT_PROJECT_NAME (optional)
    /// - PIPEWRIGHT_PURPOSE (optional, default: sensor-prediction)
    /// - PIPEWRIGHT_CONTAINER_IMAGE (optional, default: regional XGBoost image)
    /// - PIPEWRIGHT_TRAINING_INSTANCE_TYPE (optional, default: ml.m5.large)
    /// - PIPEWRIGHT_ENDPOINT_INSTANCE_TYPE (optional, default: ml.t2.medium)
    /// - PIPEWRIGHT_WORKFLOW_NAME (optional)
    /// - PIPEWRIGHT_POLL_INTERVAL (optional, seconds, default: 30)
    /// - PIPEWRIGHT_DEPLOY_MAX_ATTEMPTS (optional, default: 20)
    /// - PIPEWRIGHT_ENDPOINT_MAX_WAIT (optional, seconds, default: 900)
    /// - PIPEWRIGHT_FRESHNESS (optional, "never" | "any" | hours, default: 24)
    pub fn from_env() -> anyhow::Result<Self> {
        let control_plane_url = std::env::var("PIPEWRIGHT_CONTROL_PLANE_URL").map_err(|_| {
            anyhow::anyhow!("PIPEWRIGHT_CONTROL_PLANE_URL environment variable not set")
        })?;

        let data_bucket = std::env::var("PIPEWRIGHT_DATA_BUCKET")
            .map_err(|_| anyhow::anyhow!("PIPEWRIGHT_DATA_BUCKET environment variable not set"))?;

        let role_arn = std::env::var("PIPEWRIGHT_ROLE_ARN")
            .map_err(|_| anyhow::anyhow!("PIPEWRIGHT_ROLE_ARN environment variable not set"))?;

        Self::new(control_plane_url, data_bucket, role_arn).with_env_overrides()
    }

    /// Applies the optional `PIPEWRIGHT_*` variables on top of this config
    pub fn with_env_overrides(self) -> anyhow::Result<Self> {
        let mut config = self;

        if let Ok(region) = std::env::var("PIPEWRIGHT_REGION") {
            config = config.with_region(region);
        }

        if let Ok(project_name) = std::env::var("PIPEWRIGHT_PROJECT_NAME") {
            config.tags = vec![
                Tag::new("Project", project_name.clone()),
                Tag::new("Environment", "development"),
            ];
            config.project_name = project_name;
        }

        if let Ok(purpose) = std::env::var("PIPEWRIGHT_PURPOSE") {
            config.purpose = purpose;
        }

        if let Ok(image) = std::env::var("PIPEWRIGHT_CONTAINER_IMAGE") {
            config.container_image = image;
        }

        if let Ok(instance_type) = std::env::var("PIPEWRIGHT_TRAINING_INSTANCE_TYPE") {
            config.training_instance_type = instance_type;
        }

        if let Ok(instance_type) = std::env::var("PIPEWRIGHT_ENDPOINT_INSTANCE_TYPE") {
            config.endpoint_instance_type = instance_type;
        }

        if let Ok(workflow_name) = std::env::var("PIPEWRIGHT_WORKFLOW_NAME") {
            config.workflow_name = Some(workflow_name);
        }

        config.poll_interval = std::env::var("PIPEWRIGHT_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.poll_interval);

        config.deploy_max_attempts = std::env::var("PIPEWRIGHT_DEPLOY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(config.deploy_max_attempts);

        config.endpoint_max_wait = std::env::var("PIPEWRIGHT_ENDPOINT_MAX_WAIT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.endpoint_max_wait);

        if let Ok(freshness) = std::env::var("PIPEWRIGHT_FRESHNESS") {
            config.freshness = FreshnessPolicy::parse(&freshness)?;
        }

        Ok(config)
    }

    /// Sets the region, switching to its default container image
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.container_image = default_container_image(&region).to_string();
        self.region = region;
        self
    }

    pub fn with_workflow(mut self, workflow_name: impl Into<String>) -> Self {
        self.workflow_name = Some(workflow_name.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_freshness(mut self, freshness: FreshnessPolicy) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_samples(mut self, samples: Vec<FeatureVector>) -> Self {
        self.samples = samples;
        self
    }

    /// Sets the stale-endpoint age in whole days
    pub fn with_stale_after_days(mut self, days: u32) -> anyhow::Result<Self> {
        self.stale_endpoint_age = AgeLimit::try_days(i64::from(days))
            .ok_or_else(|| anyhow::anyhow!("stale endpoint age out of range: {} days", days))?;
        Ok(self)
    }

    /// Location of the training data handed to the training job
    pub fn training_data(&self) -> DataLocation {
        DataLocation::new(self.data_bucket.clone(), self.training_key.clone())
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.control_plane_url.is_empty() {
            anyhow::bail!("control_plane_url cannot be empty");
        }

        if !self.control_plane_url.starts_with("http://")
            && !self.control_plane_url.starts_with("https://")
        {
            anyhow::bail!("control_plane_url must start with http:// or https://");
        }

        if self.data_bucket.is_empty() {
            anyhow::bail!("data_bucket cannot be empty");
        }

        if self.role_arn.is_empty() {
            anyhow::bail!("role_arn cannot be empty");
        }

        if self.purpose.is_empty() {
            anyhow::bail!("purpose cannot be empty");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.deploy_max_attempts == 0 {
            anyhow::bail!("deploy_max_attempts must be greater than 0");
        }

        if self.endpoint_instance_count == 0 || self.training_instance_count == 0 {
            anyhow::bail!("instance counts must be greater than 0");
        }

        if self.plausibility.min >= self.plausibility.max {
            anyhow::bail!("plausibility range is empty");
        }

        if self.samples.iter().any(|s| s.0.is_empty()) {
            anyhow::bail!("sample feature vectors cannot be empty");
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(
            "http://localhost:4566".to_string(),
            "sagemaker-ml-pipeline-data".to_string(),
            "arn:aws:iam::000000000000:role/sagemaker-ml-pipeline-sagemaker-role".to_string(),
        )
    }
}

fn default_hyperparameters() -> BTreeMap<String, String> {
    [
        ("objective", "reg:squarederror"),
        ("num_round", "100"),
        ("max_depth", "6"),
        ("eta", "0.1"),
        ("subsample", "0.8"),
        ("colsample_bytree", "0.8"),
        ("min_child_weight", "1"),
        ("silent", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Reference sensor samples: temperature, humidity, temp/humidity ratio,
/// hour, day of week, day of year, rolling means and rolling deviations
pub fn default_samples() -> Vec<FeatureVector> {
    vec![
        vec![25.5, 68.2, 0.374, 8.0, 1.0, 217.0, 25.1, 67.8, 1.2, 2.1],
        vec![32.1, 55.3, 0.581, 14.0, 1.0, 217.0, 31.8, 56.1, 2.1, 3.2],
        vec![28.7, 72.4, 0.396, 19.0, 1.0, 217.0, 28.9, 71.2, 1.8, 2.8],
        vec![22.3, 78.1, 0.286, 23.0, 1.0, 217.0, 22.8, 77.5, 1.5, 2.4],
        vec![35.2, 45.8, 0.769, 12.0, 2.0, 218.0, 34.8, 46.2, 2.5, 3.1],
    ]
    .into_iter()
    .map(FeatureVector::from)
    .collect()
}
