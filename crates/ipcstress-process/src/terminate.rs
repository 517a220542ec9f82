//! Process termination primitives.

use ipcstress_common::{ProcessError, ProcessResult};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Terminate a process gracefully with SIGTERM.
///
/// Idempotent: signalling a process that has already exited (ESRCH)
/// succeeds, so repeated termination of the same handle is safe.
pub fn terminate_gracefully(id: &str, pid: u32) -> ProcessResult<()> {
    send_signal(id, pid, Signal::SIGTERM)
}

/// Force kill a process with SIGKILL. Idempotent like
/// [`terminate_gracefully`].
pub fn force_kill(id: &str, pid: u32) -> ProcessResult<()> {
    send_signal(id, pid, Signal::SIGKILL)
}

fn send_signal(id: &str, pid: u32, signal: Signal) -> ProcessResult<()> {
    let nix_pid = Pid::from_raw(pid as i32);

    match kill(nix_pid, signal) {
        Ok(()) => Ok(()),
        // Already gone: termination is best-effort and idempotent.
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(ProcessError::stop_failed(
            id,
            format!("{} to pid {} failed: {}", signal, pid, e),
        )),
    }
}
