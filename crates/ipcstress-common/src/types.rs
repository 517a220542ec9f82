//! Core domain types for the IPC stress harness.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum request count for a single download-client invocation.
///
/// Larger run totals are split into successive batches of at most this
/// many requests; the client is never driven with an unbounded run.
pub const MAX_BATCH_REQUESTS: u64 = 1000;

/// The three supervised participants of a stress run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    /// Long-lived caching server, shared across all batches of a run.
    Cache,
    /// Long-lived proxying server, shared across all batches of a run.
    Proxy,
    /// The current bounded download-client batch.
    Download,
}

impl ProcessRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessRole::Cache => "cache",
            ProcessRole::Proxy => "proxy",
            ProcessRole::Download => "download",
        }
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable configuration for one stress run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestParameters {
    /// Worker threads for the caching server.
    pub cache_thread_count: u32,
    /// Worker threads for the proxying server.
    pub proxy_thread_count: u32,
    /// Shared-buffer segment count for the proxy.
    pub proxy_segment_count: u32,
    /// Per-segment size in bytes for the proxy.
    pub proxy_segment_size: u64,
    /// Worker threads for the download client.
    pub download_thread_count: u32,
    /// Total requests to issue over the whole run. Zero is allowed and
    /// yields an immediate clean completion with no batches.
    pub request_count: u64,
    /// TCP port the proxy listens on and the client targets.
    pub port: u16,
}

impl TestParameters {
    /// Checks the parameter invariants: all counts positive, valid port.
    pub fn validate(&self) -> Result<()> {
        if self.cache_thread_count == 0 {
            return Err(Error::validation("cache thread count must be positive"));
        }
        if self.proxy_thread_count == 0 {
            return Err(Error::validation("proxy thread count must be positive"));
        }
        if self.proxy_segment_count == 0 {
            return Err(Error::validation("proxy segment count must be positive"));
        }
        if self.proxy_segment_size == 0 {
            return Err(Error::validation("proxy segment size must be positive"));
        }
        if self.download_thread_count == 0 {
            return Err(Error::validation("download thread count must be positive"));
        }
        if self.port == 0 {
            return Err(Error::validation("port must be a valid TCP port"));
        }
        Ok(())
    }
}

impl fmt::Display for TestParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cache_thread_count={}, proxy_thread_count={}, proxy_segment_count={}, \
             proxy_segment_size={}, download_thread_count={}, request_count={}, port={}",
            self.cache_thread_count,
            self.proxy_thread_count,
            self.proxy_segment_count,
            self.proxy_segment_size,
            self.download_thread_count,
            self.request_count,
            self.port
        )
    }
}

/// Outcome of one orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// All batches completed and both servers stayed alive throughout.
    Completed,
    /// The caching server exited unexpectedly.
    CacheExited,
    /// The proxying server exited unexpectedly.
    ProxyExited,
    /// Both servers exited unexpectedly in the same poll tick.
    BothExited,
}

impl RunOutcome {
    /// Process exit code reported by the orchestration call.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::CacheExited => 1,
            RunOutcome::ProxyExited => 2,
            RunOutcome::BothExited => 3,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::CacheExited => write!(f, "cache exited"),
            RunOutcome::ProxyExited => write!(f, "proxy exited"),
            RunOutcome::BothExited => write!(f, "cache and proxy exited"),
        }
    }
}

/// Accumulated user/kernel CPU time of a process, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTimes {
    pub user_ticks: u64,
    pub system_ticks: u64,
}

impl CpuTimes {
    pub fn new(user_ticks: u64, system_ticks: u64) -> Self {
        Self {
            user_ticks,
            system_ticks,
        }
    }

    /// Ticks accumulated since an earlier snapshot of the same process.
    ///
    /// Saturating: a snapshot taken from a different (reused) pid can
    /// only produce a zero delta, never an underflow.
    pub fn delta_since(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            user_ticks: self.user_ticks.saturating_sub(earlier.user_ticks),
            system_ticks: self.system_ticks.saturating_sub(earlier.system_ticks),
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.user_ticks + self.system_ticks
    }
}
