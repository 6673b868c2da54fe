//! Invocation test stage
//!
//! Sends sample feature vectors to a live endpoint and checks that the
//! predictions look plausible. Implausible values only produce warnings;
//! a sample fails only when the call fails or the response is not a number.

use pipewright_client::ControlPlane;
use pipewright_core::domain::prediction::{
    FeatureVector, InvocationReport, PlausibilityWarning, PredictionResult, SampleError, Trend,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Plausibility, PipelineConfig};
use crate::error::{StageError, StageResult};
use crate::scheduler::{CancelToken, PollError, PollPolicy, StatusPoller};

const CONTENT_TYPE: &str = "text/csv";

pub struct InvocationTestStage {
    client: Arc<dyn ControlPlane>,
    plausibility: Plausibility,
    poller: StatusPoller,
}

impl InvocationTestStage {
    pub fn new(client: Arc<dyn ControlPlane>, config: &PipelineConfig, cancel: CancelToken) -> Self {
        let policy = PollPolicy::unbounded(config.poll_interval)
            .with_transient_retries(config.transient_retries);

        Self {
            client,
            plausibility: config.plausibility,
            poller: StatusPoller::new(policy, cancel),
        }
    }

    /// Invokes the endpoint once per sample, in order
    ///
    /// The report always holds exactly one entry per sample.
    pub async fn run(
        &self,
        endpoint_name: &str,
        samples: &[FeatureVector],
    ) -> StageResult<InvocationReport> {
        info!(
            "Testing endpoint {} with {} sample(s)",
            endpoint_name,
            samples.len()
        );

        let mut results = Vec::with_capacity(samples.len());
        for (idx, sample) in samples.iter().enumerate() {
            let result = self.invoke_one(endpoint_name, sample).await?;

            match &result {
                Ok(prediction) => {
                    info!(
                        "Sample {}: prediction {:.2} ({})",
                        idx + 1,
                        prediction.value,
                        prediction
                            .trend
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "no trend".to_string())
                    );
                    for warning in &prediction.warnings {
                        warn!("Sample {}: {}", idx + 1, warning);
                    }
                }
                Err(e) => warn!("Sample {}: {}", idx + 1, e),
            }

            results.push(result);
        }

        let report = InvocationReport {
            endpoint_name: endpoint_name.to_string(),
            results,
        };
        info!(
            "Endpoint {}: {}/{} sample(s) succeeded",
            endpoint_name,
            report.succeeded(),
            report.results.len()
        );
        Ok(report)
    }

    /// Only cancellation escapes as a stage error; everything else is a
    /// per-sample failure
    async fn invoke_one(
        &self,
        endpoint_name: &str,
        sample: &FeatureVector,
    ) -> StageResult<Result<PredictionResult, SampleError>> {
        let body = sample.to_csv();
        let client = &*self.client;

        let response = self
            .poller
            .retry_transient(endpoint_name, || {
                client.invoke_endpoint(endpoint_name, CONTENT_TYPE, body.clone())
            })
            .await;

        let raw = match response {
            Ok(raw) => raw,
            Err(PollError::Cancelled) => return Err(StageError::Cancelled),
            Err(PollError::Client(e)) => return Ok(Err(SampleError::Invocation(e.to_string()))),
        };

        Ok(parse_prediction(&raw)
            .map(|value| assess(&self.plausibility, sample.primary(), value))
            .ok_or(SampleError::UnparsableResponse(raw)))
    }
}

/// Reads the single numeric prediction from a response body
///
/// Accepts a bare number or a one-element list. Bodies carrying more than
/// one value are rejected.
fn parse_prediction(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let mut fields = trimmed
        .split([',', '\n'])
        .map(str::trim)
        .filter(|f| !f.is_empty());

    let value = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Builds a prediction result with its trend and plausibility warnings
pub fn assess(bounds: &Plausibility, input_primary: Option<f64>, value: f64) -> PredictionResult {
    let mut warnings = Vec::new();

    if value < bounds.min || value > bounds.max {
        warnings.push(PlausibilityWarning::OutOfRange {
            value,
            min: bounds.min,
            max: bounds.max,
        });
    }

    let delta = input_primary.map(|primary| value - primary);
    let trend = delta.map(|d| {
        if d.abs() < bounds.stable_band {
            Trend::Stable
        } else if d > 0.0 {
            Trend::Increasing
        } else {
            Trend::Decreasing
        }
    });

    if let Some(d) = delta {
        if d.abs() > bounds.max_delta {
            warnings.push(PlausibilityWarning::LargeDelta {
                delta: d,
                bound: bounds.max_delta,
            });
        }
    }

    PredictionResult {
        input_primary,
        value,
        delta,
        trend,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prediction_formats() {
        assert_eq!(parse_prediction("26.4"), Some(26.4));
        assert_eq!(parse_prediction(" 26.4\n"), Some(26.4));
        assert_eq!(parse_prediction("[26.4]"), Some(26.4));
        assert_eq!(parse_prediction("[ 26.4 ]"), Some(26.4));
        assert_eq!(parse_prediction("not a number"), None);
        assert_eq!(parse_prediction(""), None);
        assert_eq!(parse_prediction("NaN"), None);
    }

    #[test]
    fn test_parse_prediction_rejects_multiple_values() {
        assert_eq!(parse_prediction("26.4,27.0"), None);
        assert_eq!(parse_prediction("[26.4, 27.0]"), None);
        assert_eq!(parse_prediction("26.4\n27.0\n"), None);
    }

    #[test]
    fn test_assess_trend() {
        let bounds = Plausibility::default();

        let stable = assess(&bounds, Some(25.5), 25.8);
        assert_eq!(stable.trend, Some(Trend::Stable));
        assert!(stable.is_plausible());

        let up = assess(&bounds, Some(25.5), 27.0);
        assert_eq!(up.trend, Some(Trend::Increasing));

        let down = assess(&bounds, Some(25.5), 24.0);
        assert_eq!(down.trend, Some(Trend::Decreasing));
        assert!((down.delta.unwrap() + 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_assess_warnings_do_not_reject() {
        let bounds = Plausibility::default();

        let out_of_range = assess(&bounds, Some(3.0), 4.0);
        assert_eq!(out_of_range.value, 4.0);
        assert!(matches!(
            out_of_range.warnings.as_slice(),
            [PlausibilityWarning::OutOfRange { .. }]
        ));

        let jump = assess(&bounds, Some(20.0), 30.0);
        assert!(matches!(
            jump.warnings.as_slice(),
            [PlausibilityWarning::LargeDelta { .. }]
        ));
    }

    #[test]
    fn test_assess_without_features() {
        let result = assess(&Plausibility::default(), None, 22.0);
        assert_eq!(result.delta, None);
        assert_eq!(result.trend, None);
        assert!(result.is_plausible());
    }
}
