//! E2E test support for the IPC stress harness.
//!
//! Tests run the real orchestrator against the `testexe` stand-in,
//! which emulates the cache/proxy/client launch contracts. Build the
//! whole workspace first (`cargo build --workspace`) so the stand-in
//! binary exists next to the test executables.

use ipcstress_common::TestParameters;
use ipcstress_run::RunConfig;
use ipcstress_workload::{WORKLOAD_FILENAME, WORKLOAD_LOCAL_DIR};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path to the `testexe` binary built by the workspace.
pub fn testexe_path() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // Test executables live in deps/; the bin is one level up.
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("testexe");

    if !path.exists() {
        panic!(
            "testexe binary not found at {} (build the workspace first)",
            path.display()
        );
    }
    path
}

/// Minimal valid parameters for stand-in runs.
pub fn test_parameters(request_count: u64) -> TestParameters {
    TestParameters {
        cache_thread_count: 1,
        proxy_thread_count: 1,
        proxy_segment_count: 1,
        proxy_segment_size: 1024,
        download_thread_count: 1,
        request_count,
        port: 10899,
    }
}

/// A run config pointing every collaborator at `testexe`, with timing
/// tightened for tests: short settle delay and a fast poll cadence.
///
/// The client's `--source-dir` points at the generated workload files
/// so its download emulation produces verifiable output.
pub fn test_run_config(workdir: &Path, request_count: u64) -> RunConfig {
    let testexe = testexe_path();
    let mut config = RunConfig::new(test_parameters(request_count), workdir);
    config.programs.cache = testexe.clone();
    config.programs.proxy = testexe.clone();
    config.programs.client = testexe;
    config.settle_delay = Duration::from_millis(20);
    config.poll_interval = Duration::from_millis(50);
    config.client_extra_args = vec!["--source-dir".to_string(), WORKLOAD_LOCAL_DIR.to_string()];
    config
}

/// Read back a pid recorded by a testexe `--pid-file` knob.
///
/// The knob's path is resolved relative to the supervised process's
/// working directory, which is the run's workdir.
pub fn read_pid_file(workdir: &Path, name: &str) -> u32 {
    let content = fs::read_to_string(workdir.join(name))
        .unwrap_or_else(|e| panic!("pid file {} not readable: {}", name, e));
    content
        .trim()
        .parse()
        .unwrap_or_else(|e| panic!("pid file {} malformed: {}", name, e))
}

/// Write a request descriptor without generating any workload data.
///
/// The listed paths have no source files, so the stand-in client treats
/// every request as not-found. Enough for tests that only exercise
/// supervision and never verify downloaded content.
pub fn write_stub_descriptor(workdir: &Path) -> std::io::Result<()> {
    fs::write(
        workdir.join(WORKLOAD_FILENAME),
        "/ipcstress/stub0.bin\n/ipcstress/stub1.bin\n",
    )
}
