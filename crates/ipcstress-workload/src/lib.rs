//! # IPC Stress Workload
//!
//! Workload data generation and post-run verification.
//!
//! A workload is a fixed ordered set of binary files of prescribed
//! sizes, a content-hash manifest over them, and two descriptor files:
//! one mapping served paths to source files for the cache server, one
//! listing request paths for the download client. The client cycles
//! deterministically through the request list, so byte-rate accounting
//! is exact whenever a batch's request count is a multiple of the
//! number of sized entries (the workload cycle length).

pub mod generate;
pub mod manifest;
pub mod verify;

pub use generate::create_workload;
pub use manifest::{hash_file, load_manifest, write_manifest};
pub use verify::{verify_results, VerifyReport};

/// Sizes of the workload data files in bytes.
///
/// Powers of two plus small multiples of a 16-byte block, so content
/// never lands exactly on buffer boundaries.
pub const WORKLOAD_SIZES: [u64; 10] = [
    0,
    563,
    1024 + 16,
    4096 + 7 * 16,
    65536 + 13 * 16,
    262_144 + 19 * 16,
    1_048_576 + 23 * 16,
    4 * 1_048_576 + 29 * 16,
    8 * 1_048_576 + 31 * 16,
    16 * 1_048_576 + 33 * 16,
];

/// Directory under the workdir holding the generated source files.
pub const WORKLOAD_LOCAL_DIR: &str = "ipcstress_files";

/// URL path prefix for requests; doubles as the client output directory
/// name under the workdir.
pub const WORKLOAD_URL_PATH: &str = "ipcstress";

/// Cache server descriptor: served path to source file, one per line.
pub const LOCALS_FILENAME: &str = "locals-ipcstress.txt";

/// Download client descriptor: request paths, one per line.
pub const WORKLOAD_FILENAME: &str = "workload-ipcstress.txt";

/// Content-hash manifest over the generated files.
pub const MANIFEST_FILENAME: &str = "manifest.txt";

/// Number of sized entries the client cycles through.
///
/// The request descriptor additionally carries one intentionally
/// non-existent path to exercise not-found handling, but only the sized
/// entries contribute to byte accounting.
pub fn cycle_length() -> u64 {
    WORKLOAD_SIZES.len() as u64
}

/// Total bytes transferred by one full cycle through the workload.
pub fn cycle_bytes() -> u64 {
    WORKLOAD_SIZES.iter().sum()
}
