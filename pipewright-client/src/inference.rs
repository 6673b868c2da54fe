//! Inference service endpoints

use async_trait::async_trait;
use pipewright_core::dto::inference::{
    CreateEndpoint, CreateEndpointConfig, CreateModel, EndpointDescription, EndpointSummary,
    ModelSummary,
};
use pipewright_core::dto::{CreatedResource, ListQuery};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::Result;
use crate::{ControlPlaneClient, InferenceService};

#[async_trait]
impl InferenceService for ControlPlaneClient {
    // =============================================================================
    // Creation
    // =============================================================================

    async fn create_model(&self, req: &CreateModel) -> Result<CreatedResource> {
        let url = self.url("models");
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    async fn create_endpoint_config(&self, req: &CreateEndpointConfig) -> Result<CreatedResource> {
        let url = self.url("endpoint-configs");
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    async fn create_endpoint(&self, req: &CreateEndpoint) -> Result<CreatedResource> {
        let url = self.url("endpoints");
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Inspection
    // =============================================================================

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription> {
        let url = self.url(&format!("endpoints/{}", name));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    async fn list_endpoints(&self, query: &ListQuery) -> Result<Vec<EndpointSummary>> {
        let url = self.url("endpoints");
        let response = self.client.get(&url).query(query).send().await?;

        self.handle_response(response).await
    }

    async fn list_models(&self, query: &ListQuery) -> Result<Vec<ModelSummary>> {
        let url = self.url("models");
        let response = self.client.get(&url).query(query).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Deletion
    // =============================================================================

    async fn delete_endpoint(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("endpoints/{}", name));
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    async fn delete_endpoint_config(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("endpoint-configs/{}", name));
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("models/{}", name));
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Runtime
    // =============================================================================

    async fn invoke_endpoint(
        &self,
        name: &str,
        content_type: &str,
        body: String,
    ) -> Result<String> {
        let url = self.url(&format!("endpoints/{}/invocations", name));
        debug!("Invoking {} with {} bytes", name, body.len());
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        self.handle_text_response(response).await
    }
}
