//! Crash classification: a server exiting mid-batch fails the run with
//! the outcome (and exit code) naming which side died, and no surviving
//! process outlives the orchestrating call.

use e2e_tests::{read_pid_file, test_run_config, write_stub_descriptor};
use ipcstress_common::RunOutcome;
use ipcstress_process::process_exists;
use ipcstress_run::{RunConfig, RunOrchestrator};
use std::path::Path;
use std::time::Duration;

/// Config whose client stays busy long enough for a mid-batch server
/// crash to be observed by the liveness poll. Every role records its
/// pid so the test can confirm survivors were terminated.
fn crash_config(workdir: &Path) -> RunConfig {
    let mut config = test_run_config(workdir, 400);
    config
        .cache_extra_args
        .extend(["--pid-file".to_string(), "cache.pid".to_string()]);
    config
        .proxy_extra_args
        .extend(["--pid-file".to_string(), "proxy.pid".to_string()]);
    config.client_extra_args.extend([
        "--request-delay-ms".to_string(),
        "20".to_string(),
        "--pid-file".to_string(),
        "client.pid".to_string(),
    ]);
    config
}

fn crash_args(exit_code: u32) -> Vec<String> {
    vec![
        "--crash-after-ms".to_string(),
        "100".to_string(),
        "--exit-code".to_string(),
        exit_code.to_string(),
    ]
}

fn assert_terminated(workdir: &Path, pid_file: &str) {
    let pid = read_pid_file(workdir, pid_file);
    assert!(
        !process_exists(pid).unwrap(),
        "{} (pid {}) survived the run",
        pid_file,
        pid
    );
}

#[tokio::test]
async fn test_cache_crash_fails_run_and_terminates_survivors() {
    let workdir = tempfile::TempDir::new().unwrap();
    write_stub_descriptor(workdir.path()).unwrap();

    let mut config = crash_config(workdir.path());
    config.cache_extra_args.extend(crash_args(7));

    let report = RunOrchestrator::new(config).run().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::CacheExited);
    assert_eq!(report.exit_code(), 1);
    assert!(report.summary.is_none());

    // The proxy and the in-flight batch client must not outlive run().
    assert_terminated(workdir.path(), "proxy.pid");
    assert_terminated(workdir.path(), "client.pid");
}

#[tokio::test]
async fn test_proxy_crash_fails_run_and_terminates_survivors() {
    let workdir = tempfile::TempDir::new().unwrap();
    write_stub_descriptor(workdir.path()).unwrap();

    let mut config = crash_config(workdir.path());
    config.proxy_extra_args.extend(crash_args(3));

    let report = RunOrchestrator::new(config).run().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::ProxyExited);
    assert_eq!(report.exit_code(), 2);

    assert_terminated(workdir.path(), "cache.pid");
    assert_terminated(workdir.path(), "client.pid");
}

#[tokio::test]
async fn test_both_servers_crashing_reported_together() {
    let workdir = tempfile::TempDir::new().unwrap();
    write_stub_descriptor(workdir.path()).unwrap();

    let mut config = crash_config(workdir.path());
    // Both die well inside one poll interval, so the same liveness
    // check observes both exits.
    config.poll_interval = Duration::from_millis(200);
    let crash = vec![
        "--crash-after-ms".to_string(),
        "50".to_string(),
        "--exit-code".to_string(),
        "9".to_string(),
    ];
    config.cache_extra_args.extend(crash.clone());
    config.proxy_extra_args.extend(crash);

    let report = RunOrchestrator::new(config).run().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::BothExited);
    assert_eq!(report.exit_code(), 3);

    assert_terminated(workdir.path(), "client.pid");
}

#[tokio::test]
async fn test_client_exit_code_does_not_fail_run() {
    let workdir = tempfile::TempDir::new().unwrap();
    write_stub_descriptor(workdir.path()).unwrap();

    // The batch client reporting failure is not a run failure; content
    // verification is the arbiter of correctness.
    let mut config = test_run_config(workdir.path(), 5);
    config
        .client_extra_args
        .extend(["--exit-code".to_string(), "5".to_string()]);

    let report = RunOrchestrator::new(config).run().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.requests_completed, 5);
}
