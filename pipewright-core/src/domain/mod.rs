//! Core domain types
//!
//! This module contains the structures shared by the client, the
//! orchestrator and the CLI: resource records, lifecycle statuses, run
//! aggregates and prediction results.

pub mod prediction;
pub mod resource;
pub mod run;
pub mod status;
