//! Object store DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object returned by a prefix listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}
