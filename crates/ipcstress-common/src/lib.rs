//! # IPC Stress Common
//!
//! Shared types and error handling for the IPC stress harness.
//!
//! This crate provides the foundational abstractions the other harness
//! crates build upon: the run configuration parameters, the supervised
//! process roles, CPU-time snapshots, run outcomes, and the error types.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, ProcessError, ProcessResult, Result, ResultExt};
pub use types::{CpuTimes, ProcessRole, RunOutcome, TestParameters, MAX_BATCH_REQUESTS};
