//! Object store endpoints

use async_trait::async_trait;
use pipewright_core::dto::storage::ObjectSummary;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{ControlPlaneClient, ObjectStore};

#[async_trait]
impl ObjectStore for ControlPlaneClient {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let url = self.url(&format!("objects/{}", bucket));
        debug!("Listing s3://{}/{}", bucket, prefix);
        let response = self
            .client
            .get(&url)
            .query(&[("prefix", prefix)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("objects/{}/{}", bucket, key));
        let response = self.client.get(&url).send().await?;

        let bytes = Self::check_status(response)
            .await?
            .bytes()
            .await
            .map_err(ClientError::from)?;

        Ok(bytes.to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let url = self.url(&format!("objects/{}/{}", bucket, key));
        let response = self.client.put(&url).body(body).send().await?;

        self.handle_empty_response(response).await
    }
}
