//! Run configuration: parameters, collaborator executables, timing.

use ipcstress_common::{Error, Result, TestParameters, MAX_BATCH_REQUESTS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fixed pause after starting the proxy, before the first batch, so the
/// client does not race the proxy's listen socket.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Liveness poll cadence while a batch is active. Coarse on purpose: a
/// trade-off between polling overhead and crash-detection latency.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Executable paths of the three supervised collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramPaths {
    pub cache: PathBuf,
    pub proxy: PathBuf,
    pub client: PathBuf,
}

impl Default for ProgramPaths {
    fn default() -> Self {
        Self {
            cache: PathBuf::from("./simplecached"),
            proxy: PathBuf::from("./webproxy"),
            client: PathBuf::from("./gfclient_download"),
        }
    }
}

/// Everything one orchestrated run needs.
///
/// The extra-argument vectors are appended after each collaborator's
/// contract arguments; production runs leave them empty, tests use them
/// to drive the stand-in binary's behavior knobs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub params: TestParameters,
    pub programs: ProgramPaths,
    /// Working directory for all three processes; holds the workload
    /// files, descriptors, and the client output directory.
    pub workdir: PathBuf,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    /// Cap on a single download-client invocation.
    pub max_batch_requests: u64,
    pub cache_extra_args: Vec<String>,
    pub proxy_extra_args: Vec<String>,
    pub client_extra_args: Vec<String>,
}

impl RunConfig {
    pub fn new(params: TestParameters, workdir: impl Into<PathBuf>) -> Self {
        Self {
            params,
            programs: ProgramPaths::default(),
            workdir: workdir.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_batch_requests: MAX_BATCH_REQUESTS,
            cache_extra_args: Vec::new(),
            proxy_extra_args: Vec::new(),
            client_extra_args: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        if self.max_batch_requests == 0 {
            return Err(Error::validation("max batch requests must be positive"));
        }
        if !self.workdir.is_dir() {
            return Err(Error::validation(format!(
                "workdir is not a directory: {}",
                self.workdir.display()
            )));
        }
        Ok(())
    }
}
