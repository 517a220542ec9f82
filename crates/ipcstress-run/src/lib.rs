//! # IPC Stress Run
//!
//! The orchestration and benchmarking core of the IPC stress harness.
//!
//! One run launches the two long-lived servers (cache and proxy),
//! drives the configured total request count through successive bounded
//! download-client batches, supervises liveness of all three processes
//! from a single polling control loop, and accumulates per-process CPU
//! and throughput statistics across the whole run.
//!
//! Layering, leaves first:
//!
//! - [`scheduler::BatchScheduler`]: batch sizing and completion
//! - [`bench::BenchmarkAccumulator`]: per-batch and cumulative metrics
//! - [`supervisor::ProcessSupervisor`]: process lifecycle and
//!   failure classification
//! - [`orchestrator::RunOrchestrator`]: the state machine tying them
//!   together

pub mod bench;
pub mod config;
pub mod orchestrator;
pub mod scheduler;
pub mod supervisor;

pub use bench::{BatchResult, BenchmarkAccumulator, CpuUsage, RunSummary};
pub use config::{ProgramPaths, RunConfig};
pub use orchestrator::{RunOrchestrator, RunReport};
pub use scheduler::BatchScheduler;
pub use supervisor::{ProcessSupervisor, ServerFailure};
