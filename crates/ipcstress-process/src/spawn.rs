//! Process spawning primitives.

use ipcstress_common::{ProcessError, ProcessResult};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Spawn a process with the given arguments in a working directory.
///
/// The child inherits stdout/stderr so supervised processes report
/// directly to the harness console. Spawning does not block for
/// readiness; the caller owns the returned [`Child`] handle.
pub fn spawn_command(
    id: &str,
    program: &Path,
    args: &[String],
    workdir: &Path,
) -> ProcessResult<Child> {
    Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| ProcessError::spawn_failed(id, format!("{}: {}", program.display(), e)))
}
