//! Post-run verification of downloaded content.

use crate::manifest::{file_basename, hash_file, load_manifest};
use crate::{MANIFEST_FILENAME, WORKLOAD_LOCAL_DIR, WORKLOAD_URL_PATH};
use ipcstress_common::{Result, ResultExt};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of verifying one run's output directory.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// Files present in the output directory and covered by the manifest.
    pub checked: usize,
    /// Basenames whose content did not match the manifest hash.
    pub mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn success(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Re-hash everything the client downloaded and compare against the
/// reference manifest.
///
/// Every mismatch is reported individually; the scan never aborts early,
/// so one corrupt file does not hide others. Output files without a
/// manifest entry are skipped (the not-found request never produces
/// one). A missing output directory yields an empty, successful report:
/// a run with zero batches downloads nothing.
pub fn verify_results(workdir: &Path) -> Result<VerifyReport> {
    let manifest_path = workdir.join(WORKLOAD_LOCAL_DIR).join(MANIFEST_FILENAME);
    let manifest = load_manifest(&manifest_path).context("loading reference manifest")?;

    let output_dir = workdir.join(WORKLOAD_URL_PATH);
    let mut report = VerifyReport::default();

    if !output_dir.is_dir() {
        debug!("No output directory at {}", output_dir.display());
        return Ok(report);
    }

    for entry in fs::read_dir(&output_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let basename = file_basename(&path)?;
        let expected = match manifest.get(&basename) {
            Some(hash) => hash,
            None => continue,
        };

        report.checked += 1;
        let actual = hash_file(&path)?;
        if &actual != expected {
            warn!("Hash mismatch: {}", basename);
            report.mismatches.push(basename);
        }
    }

    if report.success() {
        info!("Verified {} files, no mismatches", report.checked);
    } else {
        warn!(
            "Verified {} files, {} mismatches",
            report.checked,
            report.mismatches.len()
        );
    }

    Ok(report)
}
