//! Resource domain types
//!
//! A [`ResourceRecord`] is the orchestrator's transient reference to one
//! object owned by the control plane. It never carries authoritative state:
//! the status it holds is simply the last one observed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of cloud resource driven through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    TrainingJob,
    Model,
    EndpointConfig,
    Endpoint,
    WorkflowRun,
}

impl ResourceKind {
    /// Short slug used when generating resource names
    pub fn slug(&self) -> &'static str {
        match self {
            ResourceKind::TrainingJob => "training",
            ResourceKind::Model => "model",
            ResourceKind::EndpointConfig => "config",
            ResourceKind::Endpoint => "endpoint",
            ResourceKind::WorkflowRun => "workflow-run",
        }
    }

    /// Whether the control plane tracks a status for this kind
    pub fn has_status(&self) -> bool {
        !matches!(self, ResourceKind::Model | ResourceKind::EndpointConfig)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::TrainingJob => write!(f, "TrainingJob"),
            ResourceKind::Model => write!(f, "Model"),
            ResourceKind::EndpointConfig => write!(f, "EndpointConfig"),
            ResourceKind::Endpoint => write!(f, "Endpoint"),
            ResourceKind::WorkflowRun => write!(f, "WorkflowRun"),
        }
    }
}

/// Reference to one provisioned cloud object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    kind: ResourceKind,
    name: String,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl ResourceRecord {
    /// Creates a record for a resource that has just been requested
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            status: None,
            created_at: None,
            failure_reason: None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records the latest status observed on the control plane
    ///
    /// The failure reason is kept only while the status is a failure.
    pub fn observe(
        &mut self,
        status: impl fmt::Display,
        failed: bool,
        failure_reason: Option<String>,
    ) {
        self.status = Some(status.to_string());
        self.failure_reason = if failed { failure_reason } else { None };
    }

    pub fn with_created_at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.created_at = created_at;
        self
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Some(status) => write!(f, "{} {} ({})", self.kind, self.name, status),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Location of data in the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLocation {
    pub bucket: String,
    pub key: String,
}

impl DataLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// URI form handed to the training service
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// Parses `s3://bucket/key`; the key may be empty for a bucket root
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("s3://")?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return None;
        }
        Some(Self::new(bucket, key))
    }
}

impl fmt::Display for DataLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_clears_reason_outside_failure() {
        let mut record = ResourceRecord::new(ResourceKind::Endpoint, "ep-1");
        record.observe("Failed", true, Some("OutOfCapacity".to_string()));
        assert_eq!(record.failure_reason.as_deref(), Some("OutOfCapacity"));

        record.observe("Creating", false, Some("stale".to_string()));
        assert_eq!(record.status.as_deref(), Some("Creating"));
        assert!(record.failure_reason.is_none());
    }

    #[test]
    fn test_models_and_configs_have_no_status() {
        assert!(!ResourceKind::Model.has_status());
        assert!(!ResourceKind::EndpointConfig.has_status());
        assert!(ResourceKind::Endpoint.has_status());
    }

    #[test]
    fn test_data_location_uri() {
        let location = DataLocation::new("data-bucket", "training/data.csv");
        assert_eq!(location.uri(), "s3://data-bucket/training/data.csv");
    }

    #[test]
    fn test_data_location_parse() {
        let location = DataLocation::parse("s3://bucket/model-artifacts/").unwrap();
        assert_eq!(location.bucket, "bucket");
        assert_eq!(location.key, "model-artifacts/");
        assert_eq!(DataLocation::parse("s3://bucket").unwrap().key, "");
        assert!(DataLocation::parse("https://bucket/key").is_none());
        assert!(DataLocation::parse("s3:///key").is_none());
    }
}
