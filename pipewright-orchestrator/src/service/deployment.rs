//! Deployment stage
//!
//! Creates the model, endpoint config and endpoint for a trained artifact,
//! strictly in that order, then polls the endpoint until it is in service.

use pipewright_client::ControlPlane;
use pipewright_core::domain::resource::{ResourceKind, ResourceRecord};
use pipewright_core::domain::status::{EndpointStatus, LifecycleStatus};
use pipewright_core::dto::ListQuery;
use pipewright_core::dto::inference::{
    CreateEndpoint, CreateEndpointConfig, CreateModel, EndpointDescription,
};
use pipewright_core::naming::{DeploymentNames, ResourceNamer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::{create_resource, observe, resource_failed};
use crate::config::PipelineConfig;
use crate::error::{StageError, StageResult};
use crate::scheduler::{CancelToken, PollOutcome, PollPolicy, StatusPoller, TerminalStates};

const VARIANT_NAME: &str = "primary";

/// Endpoints inspected when looking for one to reuse
const REUSE_LOOKBACK: u32 = 10;

/// The three inference resources behind a serving endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedEndpoint {
    pub model: ResourceRecord,
    pub endpoint_config: ResourceRecord,
    pub endpoint: ResourceRecord,
}

pub struct DeploymentStage {
    client: Arc<dyn ControlPlane>,
    config: Arc<PipelineConfig>,
    namer: ResourceNamer,
    poller: StatusPoller,
}

impl DeploymentStage {
    pub fn new(client: Arc<dyn ControlPlane>, config: Arc<PipelineConfig>, cancel: CancelToken) -> Self {
        let poller = StatusPoller::new(Self::fast_path(&config), cancel);

        Self {
            namer: ResourceNamer::new(config.purpose.clone()),
            poller,
            client,
            config,
        }
    }

    /// Attempt-bounded policy used right after creation
    pub fn fast_path(config: &PipelineConfig) -> PollPolicy {
        PollPolicy::attempts(config.poll_interval, config.deploy_max_attempts)
            .with_transient_retries(config.transient_retries)
    }

    /// Wall-clock policy for waiting on an endpoint created earlier
    pub fn long_poll(config: &PipelineConfig) -> PollPolicy {
        PollPolicy::elapsed(config.poll_interval, config.endpoint_max_wait)
            .with_transient_retries(config.transient_retries)
    }

    /// Fresh names for one deployment
    pub fn names(&self) -> DeploymentNames {
        self.namer.deployment_names()
    }

    /// Deploys an artifact and waits for the endpoint on the fast path
    pub async fn run(&self, artifact_location: &str) -> StageResult<DeployedEndpoint> {
        let names = self.names();

        let model = self.create_model(&names.model, artifact_location).await?;
        let endpoint_config = self
            .create_endpoint_config(&names.endpoint_config, model.name())
            .await?;
        self.create_endpoint(&names.endpoint, endpoint_config.name())
            .await?;

        let endpoint = self
            .await_endpoint(&names.endpoint, *self.poller.policy())
            .await?;

        Ok(DeployedEndpoint {
            model,
            endpoint_config,
            endpoint,
        })
    }

    pub async fn create_model(
        &self,
        name: &str,
        artifact_location: &str,
    ) -> StageResult<ResourceRecord> {
        let request = CreateModel {
            name: name.to_string(),
            image: self.config.container_image.clone(),
            artifact_location: artifact_location.to_string(),
            role_arn: self.config.role_arn.clone(),
            environment: BTreeMap::new(),
            tags: self.config.tags.clone(),
        };
        let client = &*self.client;

        info!("Creating model {} from {}", name, artifact_location);
        create_resource(&self.poller, name, || client.create_model(&request)).await?;

        Ok(ResourceRecord::new(ResourceKind::Model, name))
    }

    pub async fn create_endpoint_config(
        &self,
        name: &str,
        model_name: &str,
    ) -> StageResult<ResourceRecord> {
        let request = CreateEndpointConfig {
            name: name.to_string(),
            model_name: model_name.to_string(),
            variant_name: VARIANT_NAME.to_string(),
            instance_type: self.config.endpoint_instance_type.clone(),
            initial_instance_count: self.config.endpoint_instance_count,
            initial_variant_weight: 1.0,
            tags: self.config.tags.clone(),
        };
        let client = &*self.client;

        info!("Creating endpoint config {}", name);
        create_resource(&self.poller, name, || client.create_endpoint_config(&request)).await?;

        Ok(ResourceRecord::new(ResourceKind::EndpointConfig, name))
    }

    pub async fn create_endpoint(
        &self,
        name: &str,
        config_name: &str,
    ) -> StageResult<ResourceRecord> {
        let request = CreateEndpoint {
            name: name.to_string(),
            config_name: config_name.to_string(),
            tags: self.config.tags.clone(),
        };
        let client = &*self.client;

        info!("Creating endpoint {}", name);
        create_resource(&self.poller, name, || client.create_endpoint(&request)).await?;

        Ok(ResourceRecord::new(ResourceKind::Endpoint, name))
    }

    /// Polls an endpoint until it is in service, failed or the policy gives up
    ///
    /// A failed endpoint is left in place for the cleanup agent.
    pub async fn await_endpoint(&self, name: &str, policy: PollPolicy) -> StageResult<ResourceRecord> {
        let client = &*self.client;
        let outcome = self
            .poller
            .with_policy(policy)
            .poll(name, &TerminalStates::default(), move || {
                client.describe_endpoint(name)
            })
            .await?;

        let mut record = ResourceRecord::new(ResourceKind::Endpoint, name);

        match outcome {
            PollOutcome::Terminal(description) => {
                observe(
                    &mut record,
                    description.status,
                    description.failure_reason.clone(),
                );
                record.created_at = description.created_at;

                if description.status.is_failure() {
                    return Err(resource_failed(record));
                }

                info!("Endpoint {} is in service", name);
                Ok(record)
            }
            PollOutcome::TimedOut { last, .. } => {
                if let Some(description) = last {
                    observe(&mut record, description.status, None);
                    record.created_at = description.created_at;
                }
                Err(StageError::TimedOut { record })
            }
        }
    }

    /// Newest in-service endpoint created by this pipeline, if any
    pub async fn find_in_service(&self) -> StageResult<Option<ResourceRecord>> {
        let prefix = self.namer.prefix_for(ResourceKind::Endpoint);
        let query = ListQuery::containing(prefix.clone(), REUSE_LOOKBACK);
        let client = &*self.client;

        let mut endpoints = self
            .poller
            .retry_transient("list endpoints", || client.list_endpoints(&query))
            .await?;
        endpoints.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let active = endpoints
            .into_iter()
            .filter(|e| e.name.starts_with(&prefix))
            .find(|e| e.status == EndpointStatus::InService)
            .map(|e| {
                let mut record = ResourceRecord::new(ResourceKind::Endpoint, e.name)
                    .with_created_at(Some(e.created_at));
                observe(&mut record, e.status, None);
                record
            });

        if let Some(record) = &active {
            info!("Reusing in-service endpoint {}", record.name());
        }
        Ok(active)
    }

    /// One-shot status lookup
    pub async fn describe(&self, name: &str) -> StageResult<EndpointDescription> {
        let client = &*self.client;
        Ok(self
            .poller
            .retry_transient(name, move || client.describe_endpoint(name))
            .await?)
    }
}
