//! Pipewright orchestrator
//!
//! Drives an ML serving pipeline on managed cloud services: training job,
//! model, endpoint config, endpoint and invocation test, with cleanup of
//! whatever a failed deployment leaves behind.
//!
//! Architecture:
//! - Configuration: [`PipelineConfig`], built once and passed explicitly
//! - Services: one executor per stage, plus cleanup and status reporting
//! - Scheduler: bounded status polling, cancellation and the orchestrator
//!   that sequences the stages
//!
//! All control-plane access goes through [`pipewright_client::ControlPlane`],
//! so every stage runs unchanged against an in-memory control plane.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;

pub use config::{FreshnessPolicy, PipelineConfig, Plausibility};
pub use error::{StageError, StageResult};
pub use scheduler::{CancelToken, PipelineOrchestrator};
