//! Pipewright Core
//!
//! Core types for the Pipewright resource lifecycle orchestrator.
//!
//! This crate contains:
//! - Domain types: resource records, lifecycle statuses, pipeline runs
//! - DTOs: request and response shapes exchanged with the control plane
//! - Naming: time-stamped resource names

pub mod domain;
pub mod dto;
pub mod naming;
