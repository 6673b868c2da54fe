//! Pipewright control-plane client
//!
//! A small, type-safe client for the managed services the pipeline drives:
//! object store, training service, inference service and ETL workflows.
//!
//! Each service is a trait so stages can be exercised against an in-memory
//! control plane in tests; [`ControlPlaneClient`] implements all of them
//! over a JSON HTTP gateway.
//!
//! # Example
//!
//! ```no_run
//! use pipewright_client::{ControlPlaneClient, InferenceService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ControlPlaneClient::new("http://localhost:4566");
//!
//!     let endpoint = client
//!         .describe_endpoint("sensor-prediction-endpoint-20250805-130217")
//!         .await?;
//!
//!     println!("{} is {}", endpoint.name, endpoint.status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod inference;
mod storage;
mod training;
mod workflows;

// Re-export commonly used types
pub use error::{ClientError, Result};

use async_trait::async_trait;
use pipewright_core::dto::inference::{
    CreateEndpoint, CreateEndpointConfig, CreateModel, EndpointDescription, EndpointSummary,
    ModelSummary,
};
use pipewright_core::dto::storage::ObjectSummary;
use pipewright_core::dto::training::{
    CreateTrainingJob, TrainingJobDescription, TrainingJobSummary,
};
use pipewright_core::dto::workflow::{StartedWorkflowRun, WorkflowRunDescription};
use pipewright_core::dto::{CreatedResource, ListQuery};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Object store operations
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists objects under a prefix without reading them
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Managed training service operations
#[async_trait]
pub trait TrainingService: Send + Sync {
    async fn create_training_job(&self, req: &CreateTrainingJob) -> Result<CreatedResource>;

    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription>;

    /// Lists training jobs, newest first
    async fn list_training_jobs(&self, query: &ListQuery) -> Result<Vec<TrainingJobSummary>>;
}

/// Managed inference service operations
///
/// Creation calls return as soon as the control plane has accepted the
/// request; endpoints then move through their own state machine.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn create_model(&self, req: &CreateModel) -> Result<CreatedResource>;

    async fn create_endpoint_config(&self, req: &CreateEndpointConfig) -> Result<CreatedResource>;

    async fn create_endpoint(&self, req: &CreateEndpoint) -> Result<CreatedResource>;

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription>;

    /// Lists endpoints, newest first
    async fn list_endpoints(&self, query: &ListQuery) -> Result<Vec<EndpointSummary>>;

    /// Lists models, newest first
    async fn list_models(&self, query: &ListQuery) -> Result<Vec<ModelSummary>>;

    async fn delete_endpoint(&self, name: &str) -> Result<()>;

    async fn delete_endpoint_config(&self, name: &str) -> Result<()>;

    async fn delete_model(&self, name: &str) -> Result<()>;

    /// Invokes an endpoint synchronously and returns the raw response body
    async fn invoke_endpoint(&self, name: &str, content_type: &str, body: String)
    -> Result<String>;
}

/// ETL workflow service operations
#[async_trait]
pub trait WorkflowService: Send + Sync {
    async fn start_workflow_run(&self, workflow_name: &str) -> Result<StartedWorkflowRun>;

    async fn get_workflow_run(
        &self,
        workflow_name: &str,
        run_id: &str,
    ) -> Result<WorkflowRunDescription>;

    /// Lists runs of a workflow, newest first
    async fn list_workflow_runs(
        &self,
        workflow_name: &str,
        max_results: u32,
    ) -> Result<Vec<WorkflowRunDescription>>;
}

/// Every service the pipeline depends on
pub trait ControlPlane: ObjectStore + TrainingService + InferenceService + WorkflowService {}

impl<T> ControlPlane for T where T: ObjectStore + TrainingService + InferenceService + WorkflowService {}

/// HTTP client for the control-plane gateway
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    /// Base URL of the gateway (e.g., "http://localhost:4566")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ControlPlaneClient {
    /// Create a new control-plane client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway (e.g., "http://localhost:4566")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use pipewright_client::ControlPlaneClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = ControlPlaneClient::with_client("http://localhost:4566", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code, mapping failures to typed errors
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_status(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        Ok(())
    }

    /// Handle an API response with a plain-text body
    async fn handle_text_response(&self, response: reqwest::Response) -> Result<String> {
        Self::check_status(response)
            .await?
            .text()
            .await
            .map_err(ClientError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ControlPlaneClient::new("http://localhost:4566");
        assert_eq!(client.base_url(), "http://localhost:4566");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ControlPlaneClient::new("http://localhost:4566/");
        assert_eq!(client.base_url(), "http://localhost:4566");
        assert_eq!(
            client.url("/endpoints/ep-1"),
            "http://localhost:4566/endpoints/ep-1"
        );
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = ControlPlaneClient::with_client("http://localhost:4566", http_client);
        assert_eq!(client.base_url(), "http://localhost:4566");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_retryable() {
        // Port 9 (discard) is closed on CI hosts; the connect error must be retryable.
        let client = ControlPlaneClient::new("http://127.0.0.1:9");
        let err = client.describe_endpoint("ep").await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
