//! Data Transfer Objects for control-plane communication
//!
//! Request and response shapes exchanged with the managed services. They
//! mirror the control plane's JSON and carry no behaviour beyond exposing
//! their status to the poller.

pub mod inference;
pub mod storage;
pub mod training;
pub mod workflow;

use serde::{Deserialize, Serialize};

/// Key/value tag attached to created resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Identifier returned by creation calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResource {
    pub arn: String,
}

/// Filter for list calls, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub name_contains: Option<String>,
    pub max_results: u32,
}

impl ListQuery {
    pub fn newest(max_results: u32) -> Self {
        Self {
            name_contains: None,
            max_results,
        }
    }

    pub fn containing(name: impl Into<String>, max_results: u32) -> Self {
        Self {
            name_contains: Some(name.into()),
            max_results,
        }
    }
}
