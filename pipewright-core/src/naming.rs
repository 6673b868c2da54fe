//! Resource naming
//!
//! Names follow `{purpose}-{kind}-{YYYYMMDD-HHMMSS}`. The timestamp has
//! second resolution, so two names for the same prefix are distinct as long
//! as they are generated at least a second apart. The orchestrator creates
//! resources sequentially, which keeps that guarantee within a run.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::resource::ResourceKind;

/// Timestamp suffix format (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Generates unique, time-stamped resource names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNamer {
    purpose: String,
}

/// Names of the three inference resources created by one deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentNames {
    pub model: String,
    pub endpoint_config: String,
    pub endpoint: String,
}

impl ResourceNamer {
    /// Creates a namer for a pipeline purpose (e.g. "sensor-prediction")
    pub fn new(purpose: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
        }
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// `{prefix}-{timestamp}` for the current time
    pub fn generate(&self, prefix: &str) -> String {
        self.generate_at(prefix, Utc::now())
    }

    /// `{prefix}-{timestamp}` for an explicit instant
    pub fn generate_at(&self, prefix: &str, at: DateTime<Utc>) -> String {
        format!("{}-{}", prefix, at.format(TIMESTAMP_FORMAT))
    }

    /// Name prefix shared by every resource of a kind, used for lookups
    pub fn prefix_for(&self, kind: ResourceKind) -> String {
        format!("{}-{}", self.purpose, kind.slug())
    }

    pub fn name_for(&self, kind: ResourceKind) -> String {
        self.name_for_at(kind, Utc::now())
    }

    pub fn name_for_at(&self, kind: ResourceKind, at: DateTime<Utc>) -> String {
        self.generate_at(&self.prefix_for(kind), at)
    }

    /// Model, config and endpoint names sharing one timestamp
    pub fn deployment_names(&self) -> DeploymentNames {
        self.deployment_names_at(Utc::now())
    }

    pub fn deployment_names_at(&self, at: DateTime<Utc>) -> DeploymentNames {
        DeploymentNames {
            model: self.name_for_at(ResourceKind::Model, at),
            endpoint_config: self.name_for_at(ResourceKind::EndpointConfig, at),
            endpoint: self.name_for_at(ResourceKind::Endpoint, at),
        }
    }

    /// Recovers the deployment trio from an endpoint name this namer produced
    pub fn siblings_of(&self, endpoint_name: &str) -> Option<DeploymentNames> {
        let prefix = format!("{}-", self.prefix_for(ResourceKind::Endpoint));
        let stamp = endpoint_name.strip_prefix(&prefix)?;
        let at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();
        Some(self.deployment_names_at(at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 5, 12, 46, 42).unwrap()
    }

    #[test]
    fn test_name_format() {
        let namer = ResourceNamer::new("sensor-prediction");
        assert_eq!(
            namer.name_for_at(ResourceKind::TrainingJob, instant()),
            "sensor-prediction-training-20250805-124642"
        );
        assert_eq!(
            namer.generate_at("custom", instant()),
            "custom-20250805-124642"
        );
    }

    #[test]
    fn test_names_one_second_apart_are_distinct() {
        let namer = ResourceNamer::new("p");
        let t1 = instant();
        for offset in 1..120 {
            let t2 = t1 + Duration::seconds(offset);
            assert_ne!(
                namer.name_for_at(ResourceKind::Endpoint, t1),
                namer.name_for_at(ResourceKind::Endpoint, t2)
            );
        }
    }

    #[test]
    fn test_deployment_names_share_timestamp() {
        let namer = ResourceNamer::new("sensor-prediction");
        let names = namer.deployment_names_at(instant());
        assert_eq!(names.model, "sensor-prediction-model-20250805-124642");
        assert_eq!(names.endpoint_config, "sensor-prediction-config-20250805-124642");
        assert_eq!(names.endpoint, "sensor-prediction-endpoint-20250805-124642");
    }

    #[test]
    fn test_siblings_round_trip_from_endpoint_name() {
        let namer = ResourceNamer::new("sensor-prediction");
        let names = namer.deployment_names_at(instant());
        assert_eq!(namer.siblings_of(&names.endpoint), Some(names));
    }

    #[test]
    fn test_siblings_rejects_foreign_names() {
        let namer = ResourceNamer::new("sensor-prediction");
        assert!(namer.siblings_of("other-endpoint-20250805-124642").is_none());
        assert!(namer
            .siblings_of("sensor-prediction-endpoint-latest")
            .is_none());
    }
}
