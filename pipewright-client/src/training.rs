//! Training service endpoints

use async_trait::async_trait;
use pipewright_core::dto::training::{
    CreateTrainingJob, TrainingJobDescription, TrainingJobSummary,
};
use pipewright_core::dto::{CreatedResource, ListQuery};

use crate::error::Result;
use crate::{ControlPlaneClient, TrainingService};

#[async_trait]
impl TrainingService for ControlPlaneClient {
    async fn create_training_job(&self, req: &CreateTrainingJob) -> Result<CreatedResource> {
        let url = self.url("training-jobs");
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription> {
        let url = self.url(&format!("training-jobs/{}", name));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    async fn list_training_jobs(&self, query: &ListQuery) -> Result<Vec<TrainingJobSummary>> {
        let url = self.url("training-jobs");
        let response = self.client.get(&url).query(query).send().await?;

        self.handle_response(response).await
    }
}
