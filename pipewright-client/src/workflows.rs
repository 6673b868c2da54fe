//! ETL workflow endpoints

use async_trait::async_trait;
use pipewright_core::dto::workflow::{StartedWorkflowRun, WorkflowRunDescription};

use crate::error::Result;
use crate::{ControlPlaneClient, WorkflowService};

#[async_trait]
impl WorkflowService for ControlPlaneClient {
    async fn start_workflow_run(&self, workflow_name: &str) -> Result<StartedWorkflowRun> {
        let url = self.url(&format!("workflows/{}/runs", workflow_name));
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    async fn get_workflow_run(
        &self,
        workflow_name: &str,
        run_id: &str,
    ) -> Result<WorkflowRunDescription> {
        let url = self.url(&format!("workflows/{}/runs/{}", workflow_name, run_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    async fn list_workflow_runs(
        &self,
        workflow_name: &str,
        max_results: u32,
    ) -> Result<Vec<WorkflowRunDescription>> {
        let url = self.url(&format!("workflows/{}/runs", workflow_name));
        let response = self
            .client
            .get(&url)
            .query(&[("max_results", max_results)])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
