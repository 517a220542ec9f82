//! Supervision of the cache, proxy, and download-client processes.

use crate::config::RunConfig;
use ipcstress_common::{CpuTimes, ProcessError, ProcessResult, ProcessRole};
use ipcstress_process::{force_kill, read_cpu_times, spawn_command, terminate_gracefully};
use ipcstress_workload::{LOCALS_FILENAME, WORKLOAD_FILENAME};
use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A supervised child plus the CPU snapshot taken at the last batch
/// boundary. The handle outlives the process: after exit it keeps
/// reporting the recorded status until replaced.
struct ProcessHandle {
    child: Child,
    last_cpu: CpuTimes,
}

/// Which server(s) died, with their exit codes. A download-batch exit
/// is never a failure; it signals batch completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFailure {
    Cache(i32),
    Proxy(i32),
    Both { cache: i32, proxy: i32 },
}

/// Owns the three subprocess handles for one run.
///
/// The cache and proxy live for the whole run; the batch handle is
/// replaced once per batch boundary. Only the orchestrator drives this
/// type, so every mutation of process lifecycle goes through one place.
pub struct ProcessSupervisor {
    config: RunConfig,
    cache: Option<ProcessHandle>,
    proxy: Option<ProcessHandle>,
    batch: Option<ProcessHandle>,
}

impl ProcessSupervisor {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            cache: None,
            proxy: None,
            batch: None,
        }
    }

    /// Launch the caching server. Does not block for readiness.
    pub fn start_cache(&mut self) -> ProcessResult<u32> {
        let mut args = vec![
            "-c".to_string(),
            format!("./{}", LOCALS_FILENAME),
            "-t".to_string(),
            self.config.params.cache_thread_count.to_string(),
        ];
        args.extend(self.config.cache_extra_args.iter().cloned());
        let handle = self.spawn(ProcessRole::Cache, &self.config.programs.cache, &args)?;
        let pid = handle.child.id();
        self.cache = Some(handle);
        Ok(pid)
    }

    /// Launch the proxying server. Does not block for readiness; the
    /// orchestrator inserts the settle delay before the first batch.
    pub fn start_proxy(&mut self) -> ProcessResult<u32> {
        let mut args = vec![
            "-n".to_string(),
            self.config.params.proxy_segment_count.to_string(),
            "-p".to_string(),
            self.config.params.port.to_string(),
            "-t".to_string(),
            self.config.params.proxy_thread_count.to_string(),
            "-z".to_string(),
            self.config.params.proxy_segment_size.to_string(),
        ];
        args.extend(self.config.proxy_extra_args.iter().cloned());
        let handle = self.spawn(ProcessRole::Proxy, &self.config.programs.proxy, &args)?;
        let pid = handle.child.id();
        self.proxy = Some(handle);
        Ok(pid)
    }

    /// Launch one bounded download-client batch of exactly `batch_size`
    /// requests, replacing any previous (exited) batch handle.
    pub fn start_batch(&mut self, batch_size: u64) -> ProcessResult<u32> {
        let mut args = vec![
            "-p".to_string(),
            self.config.params.port.to_string(),
            "-t".to_string(),
            self.config.params.download_thread_count.to_string(),
            "-w".to_string(),
            format!("./{}", WORKLOAD_FILENAME),
            "-r".to_string(),
            batch_size.to_string(),
        ];
        args.extend(self.config.client_extra_args.iter().cloned());
        let handle = self.spawn(ProcessRole::Download, &self.config.programs.client, &args)?;
        let pid = handle.child.id();
        self.batch = Some(handle);
        Ok(pid)
    }

    fn spawn(
        &self,
        role: ProcessRole,
        program: &std::path::Path,
        args: &[String],
    ) -> ProcessResult<ProcessHandle> {
        let child = spawn_command(role.as_str(), program, args, &self.config.workdir)?;
        let pid = child.id();
        // Baseline CPU snapshot; a spawn-to-exit race just means the
        // first delta is measured from zero.
        let last_cpu = read_cpu_times(pid).unwrap_or_default();
        debug!(role = role.as_str(), pid, "started process");
        Ok(ProcessHandle { child, last_cpu })
    }

    /// Whether a batch handle exists (running or already exited).
    pub fn batch_started(&self) -> bool {
        self.batch.is_some()
    }

    /// Non-blocking exit poll. `None` while running; an exit reports
    /// the code, with `-1` standing in for signal deaths.
    pub fn poll(&mut self, role: ProcessRole) -> ProcessResult<Option<i32>> {
        let handle = self
            .handle_mut(role)
            .ok_or_else(|| ProcessError::not_found(role.as_str()))?;
        match handle.child.try_wait() {
            Ok(Some(status)) => Ok(Some(status.code().unwrap_or(-1))),
            Ok(None) => Ok(None),
            Err(e) => Err(ProcessError::poll_failed(role.as_str(), e.to_string())),
        }
    }

    /// Per-tick failure classification over the two servers.
    pub fn check_servers(&mut self) -> ProcessResult<Option<ServerFailure>> {
        let cache_poll = self.poll(ProcessRole::Cache)?;
        let proxy_poll = self.poll(ProcessRole::Proxy)?;
        debug!(?cache_poll, ?proxy_poll, "server poll");

        Ok(match (cache_poll, proxy_poll) {
            (Some(cache), Some(proxy)) => Some(ServerFailure::Both { cache, proxy }),
            (Some(cache), None) => Some(ServerFailure::Cache(cache)),
            (None, Some(proxy)) => Some(ServerFailure::Proxy(proxy)),
            (None, None) => None,
        })
    }

    /// CPU ticks a server accumulated since the previous boundary.
    ///
    /// The stored snapshot is replaced on every successful read, so
    /// deltas never double-count across batches. `None` when the read
    /// raced the process's exit; the caller records no delta this tick.
    pub fn server_cpu_delta(&mut self, role: ProcessRole) -> Option<CpuTimes> {
        let handle = self.handle_mut(role)?;
        let pid = handle.child.id();
        match read_cpu_times(pid) {
            Ok(current) => {
                let delta = current.delta_since(&handle.last_cpu);
                handle.last_cpu = current;
                Some(delta)
            }
            Err(e) => {
                debug!(role = role.as_str(), pid, error = %e, "cpu read raced process exit");
                None
            }
        }
    }

    /// Best-effort SIGTERM. Idempotent: terminating an exited or absent
    /// handle succeeds.
    pub fn terminate(&mut self, role: ProcessRole) -> ProcessResult<()> {
        if let Some(handle) = self.handle_mut(role) {
            let pid = handle.child.id();
            terminate_gracefully(role.as_str(), pid)?;
            debug!(role = role.as_str(), pid, "terminate signalled");
        }
        Ok(())
    }

    /// Eagerly terminate everything still supervised, so no process
    /// outlives the orchestrating call. Errors are reported, not
    /// propagated; cleanup continues through all three roles.
    ///
    /// Every handle is reaped before this returns: SIGTERM alone only
    /// delivers the signal, and dropping an unreaped [`Child`] leaves a
    /// zombie in the process table for each point of a long sweep.
    pub fn terminate_all(&mut self) {
        for role in [ProcessRole::Download, ProcessRole::Proxy, ProcessRole::Cache] {
            if let Err(e) = self.terminate(role) {
                warn!(role = role.as_str(), error = %e, "terminate failed");
            }
        }
        for role in [ProcessRole::Download, ProcessRole::Proxy, ProcessRole::Cache] {
            if let Some(handle) = self.handle_mut(role) {
                reap_handle(role, handle);
            }
        }
    }

    fn handle_mut(&mut self, role: ProcessRole) -> Option<&mut ProcessHandle> {
        match role {
            ProcessRole::Cache => self.cache.as_mut(),
            ProcessRole::Proxy => self.proxy.as_mut(),
            ProcessRole::Download => self.batch.as_mut(),
        }
    }
}

/// How long a signalled process gets to exit before escalation.
const REAP_TIMEOUT: Duration = Duration::from_secs(2);
const REAP_POLL: Duration = Duration::from_millis(20);

/// Wait for a signalled (or already-exited) child to exit and reap it,
/// escalating to SIGKILL when SIGTERM goes unanswered within
/// [`REAP_TIMEOUT`].
fn reap_handle(role: ProcessRole, handle: &mut ProcessHandle) {
    let deadline = Instant::now() + REAP_TIMEOUT;
    loop {
        match handle.child.try_wait() {
            Ok(Some(status)) => {
                debug!(role = role.as_str(), %status, "reaped");
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(role = role.as_str(), error = %e, "reap poll failed");
                return;
            }
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(REAP_POLL);
    }

    let pid = handle.child.id();
    warn!(role = role.as_str(), pid, "no exit after SIGTERM, killing");
    if let Err(e) = force_kill(role.as_str(), pid) {
        warn!(role = role.as_str(), pid, error = %e, "force kill failed");
        return;
    }
    // SIGKILL cannot be ignored; the blocking wait is prompt.
    if let Err(e) = handle.child.wait() {
        warn!(role = role.as_str(), pid, error = %e, "reap after kill failed");
    }
}
