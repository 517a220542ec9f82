//! Workload generation: data files, manifest, and descriptors.

use crate::manifest::write_manifest;
use crate::{
    LOCALS_FILENAME, MANIFEST_FILENAME, WORKLOAD_FILENAME, WORKLOAD_LOCAL_DIR, WORKLOAD_SIZES,
    WORKLOAD_URL_PATH,
};
use ipcstress_common::{Result, ResultExt};
use rand::RngCore;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Create the workload under `workdir`:
///
/// - `ipcstress_files/workload{i}.bin` random data files, one per entry
///   of [`WORKLOAD_SIZES`] (existing files of the right size are kept,
///   so repeated sweeps only pay the generation cost once),
/// - the content-hash manifest over them,
/// - the cache locals descriptor (served path to source file),
/// - the client request descriptor (the served paths plus one
///   intentionally non-existent path to exercise not-found handling).
///
/// Any stale client output directory is removed; the client recreates
/// it on its first run.
pub fn create_workload(workdir: &Path) -> Result<()> {
    let files_dir = workdir.join(WORKLOAD_LOCAL_DIR);
    fs::create_dir_all(&files_dir)?;

    info!("Creating workload data files in {}", files_dir.display());
    let mut filenames = Vec::with_capacity(WORKLOAD_SIZES.len());
    for (i, &size) in WORKLOAD_SIZES.iter().enumerate() {
        let path = files_dir.join(format!("workload{}.bin", i));
        if file_has_size(&path, size) {
            debug!("Keeping existing {}", path.display());
        } else {
            debug!("Writing {} ({} bytes)", path.display(), size);
            write_random_file(&path, size)?;
        }
        filenames.push(path);
    }

    let manifest_path = files_dir.join(MANIFEST_FILENAME);
    info!("Creating hash manifest: {}", manifest_path.display());
    write_manifest(&manifest_path, &filenames).context("writing hash manifest")?;

    let locals_path = workdir.join(LOCALS_FILENAME);
    info!("Creating locals descriptor: {}", locals_path.display());
    write_locals_descriptor(&locals_path, &filenames)?;

    let workload_path = workdir.join(WORKLOAD_FILENAME);
    info!("Creating request descriptor: {}", workload_path.display());
    write_request_descriptor(&workload_path)?;

    // Stale output from a previous run would pass verification.
    let output_dir = workdir.join(WORKLOAD_URL_PATH);
    if output_dir.exists() {
        fs::remove_dir_all(&output_dir)?;
    }

    Ok(())
}

fn file_has_size(path: &Path, size: u64) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() == size).unwrap_or(false)
}

fn write_random_file(path: &Path, size: u64) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut rng = rand::thread_rng();
    let mut chunk = [0u8; 8192];

    let mut remaining = size as usize;
    while remaining > 0 {
        let n = remaining.min(chunk.len());
        rng.fill_bytes(&mut chunk[..n]);
        writer.write_all(&chunk[..n])?;
        remaining -= n;
    }
    writer.flush()?;
    Ok(())
}

/// Served path to source file, one mapping per line. Source paths are
/// relative to the workdir, which is the cache server's working
/// directory when launched by the supervisor.
fn write_locals_descriptor(locals_path: &Path, filenames: &[PathBuf]) -> Result<()> {
    let mut lines = String::new();
    for (i, _) in filenames.iter().enumerate() {
        lines.push_str(&format!(
            "/{}/workload{}.bin {}/workload{}.bin\n",
            WORKLOAD_URL_PATH, i, WORKLOAD_LOCAL_DIR, i
        ));
    }
    fs::write(locals_path, lines)?;
    Ok(())
}

/// The request paths the client cycles through: every served path plus
/// one path that intentionally does not exist.
fn write_request_descriptor(workload_path: &Path) -> Result<()> {
    let mut lines = String::new();
    for i in 0..WORKLOAD_SIZES.len() {
        lines.push_str(&format!("/{}/workload{}.bin\n", WORKLOAD_URL_PATH, i));
    }
    lines.push_str(&format!("/{}/workload_FNF.bin\n", WORKLOAD_URL_PATH));
    fs::write(workload_path, lines)?;
    Ok(())
}
