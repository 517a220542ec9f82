//! Content-hash manifest over the workload files.
//!
//! Line format: `<hex hash>  <basename>`, keyed by basename so the
//! verifier can match client output files regardless of directory.

use ipcstress_common::{Error, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Hash a file's content, returning the lowercase hex digest.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Write the manifest for the given files.
pub fn write_manifest(manifest_path: &Path, files: &[impl AsRef<Path>]) -> Result<()> {
    let mut lines = String::new();
    for file in files {
        let file = file.as_ref();
        let basename = file_basename(file)?;
        let hash = hash_file(file)?;
        lines.push_str(&format!("{}  {}\n", hash, basename));
    }
    fs::write(manifest_path, lines)?;
    Ok(())
}

/// Load a manifest as a basename-to-hash map.
pub fn load_manifest(manifest_path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(manifest_path)?;
    let mut hashes = HashMap::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (hash, name) = line.split_once(char::is_whitespace).ok_or_else(|| {
            Error::descriptor(
                manifest_path.display().to_string(),
                format!("line {}: expected '<hash> <name>'", lineno + 1),
            )
        })?;
        hashes.insert(name.trim().to_string(), hash.to_string());
    }

    Ok(hashes)
}

pub(crate) fn file_basename(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::workload(format!("path has no file name: {}", path.display()))
        })
}
