//! The run state machine.
//!
//! `Init → ServersStarting → AwaitSettle → BatchActive ⇄ BatchBoundary
//! → {BatchActive | Done} | Failed`. A single control task drives the
//! loop; the only intentional blocking is the settle delay and the poll
//! cadence, everything else is non-blocking polls against the
//! supervisor. All real concurrency lives inside the supervised
//! processes.

use crate::bench::{BenchmarkAccumulator, RunSummary};
use crate::config::RunConfig;
use crate::scheduler::BatchScheduler;
use crate::supervisor::{ProcessSupervisor, ServerFailure};
use ipcstress_common::{ProcessRole, Result, RunOutcome};
use ipcstress_process::ticks_per_second;
use std::fmt;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Control-loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    ServersStarting,
    AwaitSettle,
    BatchActive,
    BatchBoundary,
    Done,
    Failed(RunOutcome),
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::ServersStarting => write!(f, "servers_starting"),
            RunPhase::AwaitSettle => write!(f, "await_settle"),
            RunPhase::BatchActive => write!(f, "batch_active"),
            RunPhase::BatchBoundary => write!(f, "batch_boundary"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Failed(outcome) => write!(f, "failed({})", outcome),
        }
    }
}

/// Mutable run-scoped bookkeeping, discarded when the run ends.
struct RunState {
    remaining: u64,
    batch_request_count: u64,
    /// Wall-clock start of the in-flight batch; `None` at boundaries.
    batch_started_at: Option<Instant>,
}

/// What one orchestrated run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub batches: u32,
    pub requests_completed: u64,
    /// Present only when more than one batch executed.
    pub summary: Option<RunSummary>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Ties the supervisor, scheduler, and accumulator together into one
/// call that either runs every batch to completion or returns the
/// classified failure.
pub struct RunOrchestrator {
    config: RunConfig,
    scheduler: BatchScheduler,
}

impl RunOrchestrator {
    pub fn new(config: RunConfig) -> Self {
        let scheduler = BatchScheduler::new(config.max_batch_requests);
        Self { config, scheduler }
    }

    /// Execute one full run.
    ///
    /// On any exit path, everything the supervisor started is
    /// terminated before this returns; no supervised process outlives
    /// the call.
    pub async fn run(&self) -> Result<RunReport> {
        // Init: nothing is spawned until the parameters hold.
        self.config.validate()?;
        info!("Starting run: {}", self.config.params);

        let mut supervisor = ProcessSupervisor::new(self.config.clone());
        let result = self.drive(&mut supervisor).await;
        supervisor.terminate_all();

        if let Ok(report) = &result {
            match report.outcome {
                RunOutcome::Completed => info!(
                    "Run completed: {} requests in {} batches",
                    report.requests_completed, report.batches
                ),
                outcome => warn!("Run failed: {}", outcome),
            }
        }
        result
    }

    async fn drive(&self, supervisor: &mut ProcessSupervisor) -> Result<RunReport> {
        let mut accumulator =
            BenchmarkAccumulator::new(ticks_per_second(), self.config.params.request_count);
        let mut state = RunState {
            remaining: self.config.params.request_count,
            batch_request_count: 0,
            batch_started_at: None,
        };
        let mut phase = RunPhase::ServersStarting;

        loop {
            debug!(phase = %phase, remaining = state.remaining, "tick");
            match phase {
                RunPhase::ServersStarting => {
                    supervisor.start_cache()?;
                    supervisor.start_proxy()?;
                    phase = RunPhase::AwaitSettle;
                }

                RunPhase::AwaitSettle => {
                    // Let the proxy reach its listen socket before the
                    // first client connects.
                    sleep(self.config.settle_delay).await;
                    phase = RunPhase::BatchBoundary;
                }

                RunPhase::BatchBoundary => {
                    let in_flight = state.batch_started_at.is_some();
                    if self.scheduler.is_run_complete(state.remaining, in_flight) {
                        phase = RunPhase::Done;
                        continue;
                    }

                    let batch_size = self.scheduler.next_batch_size(state.remaining);
                    supervisor.start_batch(batch_size)?;
                    state.remaining -= batch_size;
                    state.batch_request_count = batch_size;
                    state.batch_started_at = Some(Instant::now());
                    phase = RunPhase::BatchActive;
                }

                RunPhase::BatchActive => {
                    if let Some(failure) = supervisor.check_servers()? {
                        phase = RunPhase::Failed(classify_failure(failure));
                        continue;
                    }

                    if let Some(code) = supervisor.poll(ProcessRole::Download)? {
                        // The client's own exit code is observed but not
                        // classified; correctness shows up in the
                        // post-run hash verification instead.
                        debug!(code, "download batch exited");
                        let elapsed = state
                            .batch_started_at
                            .take()
                            .map(|started| started.elapsed())
                            .unwrap_or_default();
                        let cache_delta = supervisor.server_cpu_delta(ProcessRole::Cache);
                        let proxy_delta = supervisor.server_cpu_delta(ProcessRole::Proxy);
                        accumulator.on_batch_complete(
                            state.batch_request_count,
                            elapsed,
                            cache_delta,
                            proxy_delta,
                        );
                        phase = RunPhase::BatchBoundary;
                        continue;
                    }

                    sleep(self.config.poll_interval).await;
                }

                RunPhase::Done => {
                    supervisor.terminate(ProcessRole::Cache)?;
                    supervisor.terminate(ProcessRole::Proxy)?;
                    let summary = accumulator.finalize();
                    if let Some(summary) = &summary {
                        info!("{}", summary);
                    }
                    return Ok(RunReport {
                        outcome: RunOutcome::Completed,
                        batches: accumulator.batches(),
                        requests_completed: accumulator.requests_done(),
                        summary,
                    });
                }

                RunPhase::Failed(outcome) => {
                    // Eager cleanup happens in run(); returning here is
                    // enough to abandon the in-flight batch.
                    return Ok(RunReport {
                        outcome,
                        batches: accumulator.batches(),
                        requests_completed: accumulator.requests_done(),
                        summary: None,
                    });
                }
            }
        }
    }
}

fn classify_failure(failure: ServerFailure) -> RunOutcome {
    match failure {
        ServerFailure::Both { cache, proxy } => {
            warn!(cache, proxy, "both cache and proxy exited");
            RunOutcome::BothExited
        }
        ServerFailure::Cache(code) => {
            warn!(code, "cache exited");
            RunOutcome::CacheExited
        }
        ServerFailure::Proxy(code) => {
            warn!(code, "proxy exited");
            RunOutcome::ProxyExited
        }
    }
}
