//! Clean-run scenarios: batches execute to completion, downloaded
//! content verifies against the manifest, and summary emission follows
//! the multi-batch rule.

use e2e_tests::{test_run_config, write_stub_descriptor};
use ipcstress_common::RunOutcome;
use ipcstress_run::RunOrchestrator;
use ipcstress_workload::{create_workload, verify_results};
use tempfile::TempDir;

#[tokio::test]
async fn test_multi_batch_run_round_trip() {
    let workdir = TempDir::new().unwrap();
    create_workload(workdir.path()).unwrap();

    // 22 requests against a 10-request cap: batches of 10, 10, 2.
    let mut config = test_run_config(workdir.path(), 22);
    config.max_batch_requests = 10;

    let report = RunOrchestrator::new(config).run().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.batches, 3);
    assert_eq!(report.requests_completed, 22);
    assert!(report.summary.is_some(), "multi-batch run must summarize");

    // 22 requests cycle through all 11 descriptor entries twice, so
    // every manifest-covered file lands in the output directory.
    let verify = verify_results(workdir.path()).unwrap();
    assert!(verify.success(), "mismatches: {:?}", verify.mismatches);
    assert_eq!(verify.checked, 10);
}

#[tokio::test]
async fn test_single_batch_run_has_no_summary() {
    let workdir = TempDir::new().unwrap();
    write_stub_descriptor(workdir.path()).unwrap();

    let config = test_run_config(workdir.path(), 5);
    let report = RunOrchestrator::new(config).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.batches, 1);
    assert_eq!(report.requests_completed, 5);
    assert!(report.summary.is_none());
}

#[tokio::test]
async fn test_zero_request_run_completes_without_batches() {
    let workdir = TempDir::new().unwrap();

    let config = test_run_config(workdir.path(), 0);
    let report = RunOrchestrator::new(config).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.batches, 0);
    assert_eq!(report.requests_completed, 0);
    assert!(report.summary.is_none());
}

#[tokio::test]
async fn test_invalid_workdir_rejected_before_spawning() {
    let config = test_run_config(std::path::Path::new("/nonexistent/ipcstress"), 5);
    assert!(RunOrchestrator::new(config).run().await.is_err());
}

/// Exited but unreaped children of this test process, scanned from
/// `/proc`. State is the field right after the comm, ppid the next one.
fn zombie_children() -> Vec<u32> {
    let own = std::process::id();
    let mut zombies = Vec::new();
    let entries = match std::fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(_) => return zombies,
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let pid: u32 = match name.to_string_lossy().parse() {
            Ok(pid) => pid,
            Err(_) => continue,
        };
        let stat = match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat,
            Err(_) => continue,
        };
        let rest = match stat.rfind(')') {
            Some(idx) => &stat[idx + 1..],
            None => continue,
        };
        let mut fields = rest.split_whitespace();
        let state = fields.next();
        let ppid = fields.next().and_then(|p| p.parse::<u32>().ok());
        if state == Some("Z") && ppid == Some(own) {
            zombies.push(pid);
        }
    }
    zombies
}

#[tokio::test]
async fn test_completed_run_leaves_no_zombie_children() {
    let workdir = TempDir::new().unwrap();
    write_stub_descriptor(workdir.path()).unwrap();

    let config = test_run_config(workdir.path(), 5);
    let report = RunOrchestrator::new(config).run().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);

    // Concurrent tests in this process may have transiently unreaped
    // children of their own; only a persistent zombie is a leak.
    let mut leaked = zombie_children();
    for _ in 0..20 {
        if leaked.is_empty() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        leaked = zombie_children();
    }
    panic!("run left unreaped zombie children: {:?}", leaked);
}
