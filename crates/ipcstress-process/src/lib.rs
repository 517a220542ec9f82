//! # IPC Stress Process
//!
//! Low-level Unix process operations for the IPC stress harness:
//!
//! - Process spawning
//! - Process existence checking
//! - Process termination
//! - Per-process CPU-time accounting from `/proc`
//!
//! Everything here is pid-based. A pid is an OS-level weak reference:
//! it never implies liveness, so each operation re-checks status and
//! reports `ProcessError::NotFound` rather than assuming validity.

pub mod check;
pub mod cpu_time;
pub mod spawn;
pub mod terminate;

// Re-export main functions
pub use check::process_exists;
pub use cpu_time::{read_cpu_times, ticks_per_second};
pub use spawn::spawn_command;
pub use terminate::{force_kill, terminate_gracefully};
