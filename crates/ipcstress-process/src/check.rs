//! Process existence checking.

use ipcstress_common::{ProcessError, ProcessResult};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Check whether a process with the given pid exists.
///
/// Uses `kill(pid, 0)`, which sends no signal but reports whether the
/// process exists. A permission error still means the process exists.
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    let nix_pid = Pid::from_raw(pid as i32);

    match kill(nix_pid, None) {
        Ok(_) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(Errno::EPERM) => Ok(true),
        Err(e) => Err(ProcessError::poll_failed(
            pid.to_string(),
            format!("existence check failed: {}", e),
        )),
    }
}
