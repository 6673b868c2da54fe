//! Inference service DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::status::{EndpointStatus, StatusReport};
use crate::dto::Tag;

/// Request to register a model from a trained artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModel {
    pub name: String,
    pub image: String,
    pub artifact_location: String,
    pub role_arn: String,
    pub environment: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
}

/// Request to create an endpoint configuration for one model variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEndpointConfig {
    pub name: String,
    pub model_name: String,
    pub variant_name: String,
    pub instance_type: String,
    pub initial_instance_count: u32,
    pub initial_variant_weight: f32,
    pub tags: Vec<Tag>,
}

/// Request to create an endpoint from a configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEndpoint {
    pub name: String,
    pub config_name: String,
    pub tags: Vec<Tag>,
}

/// Full description of an endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDescription {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub config_name: Option<String>,
    pub status: EndpointStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl StatusReport for EndpointDescription {
    type Status = EndpointStatus;

    fn status(&self) -> EndpointStatus {
        self.status
    }
}

/// Endpoint entry returned by list calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSummary {
    pub name: String,
    pub status: EndpointStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Model entry returned by list calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
}
