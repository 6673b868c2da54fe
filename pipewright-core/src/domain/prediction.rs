//! Prediction domain types
//!
//! Inputs and results of exercising a deployed endpoint with sample data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One headerless row of numeric features
///
/// The first feature is the primary one (current temperature for the
/// reference sensor model) and is what plausibility checks compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn primary(&self) -> Option<f64> {
        self.0.first().copied()
    }

    /// Serializes to the endpoint's wire format: comma-separated, no header
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Direction of the predicted change relative to the primary feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Stable,
    Increasing,
    Decreasing,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Stable => write!(f, "stable"),
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// Sanity-check findings on a prediction; never fatal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlausibilityWarning {
    OutOfRange { value: f64, min: f64, max: f64 },
    LargeDelta { delta: f64, bound: f64 },
}

impl fmt::Display for PlausibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlausibilityWarning::OutOfRange { value, min, max } => {
                write!(f, "prediction {value:.2} outside [{min}, {max}]")
            }
            PlausibilityWarning::LargeDelta { delta, bound } => {
                write!(f, "change {delta:+.2} exceeds ±{bound}")
            }
        }
    }
}

/// Parsed result of one endpoint invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub input_primary: Option<f64>,
    pub value: f64,
    pub delta: Option<f64>,
    pub trend: Option<Trend>,
    pub warnings: Vec<PlausibilityWarning>,
}

impl PredictionResult {
    pub fn is_plausible(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Why a single sample produced no prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleError {
    Invocation(String),
    UnparsableResponse(String),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Invocation(msg) => write!(f, "invocation failed: {msg}"),
            SampleError::UnparsableResponse(body) => {
                write!(f, "response is not a number: {body:?}")
            }
        }
    }
}

/// Outcome of exercising an endpoint, one entry per sample in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationReport {
    pub endpoint_name: String,
    pub results: Vec<Result<PredictionResult, SampleError>>,
}

impl InvocationReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Strict majority of samples produced a prediction
    pub fn is_operational(&self) -> bool {
        !self.results.is_empty() && self.succeeded() * 2 > self.results.len()
    }

    /// First successful prediction, used as the run's sample result
    pub fn first_prediction(&self) -> Option<f64> {
        self.results
            .iter()
            .find_map(|r| r.as_ref().ok().map(|p| p.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(value: f64) -> Result<PredictionResult, SampleError> {
        Ok(PredictionResult {
            input_primary: Some(20.0),
            value,
            delta: Some(value - 20.0),
            trend: None,
            warnings: vec![],
        })
    }

    #[test]
    fn test_csv_has_no_header_or_spaces() {
        let vector = FeatureVector::new(vec![25.5, 68.2, 0.374, 8.0]);
        assert_eq!(vector.to_csv(), "25.5,68.2,0.374,8");
        assert_eq!(vector.primary(), Some(25.5));
    }

    #[test]
    fn test_operational_requires_strict_majority() {
        let err = || Err(SampleError::Invocation("boom".to_string()));

        let report = InvocationReport {
            endpoint_name: "ep".to_string(),
            results: vec![ok(21.0), err(), ok(22.0)],
        };
        assert!(report.is_operational());
        assert_eq!(report.first_prediction(), Some(21.0));

        let split = InvocationReport {
            endpoint_name: "ep".to_string(),
            results: vec![ok(21.0), err()],
        };
        assert!(!split.is_operational());

        let empty = InvocationReport {
            endpoint_name: "ep".to_string(),
            results: vec![],
        };
        assert!(!empty.is_operational());
    }
}
