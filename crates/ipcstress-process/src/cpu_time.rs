//! Per-process CPU-time accounting from `/proc/<pid>/stat`.
//!
//! The harness compares successive snapshots of a supervised process's
//! accumulated user/kernel ticks to attribute CPU cost to each batch of
//! requests. Reads can race process exit: a process that disappears
//! between poll and read reports [`ProcessError::NotFound`],
//! which callers treat as "no delta this tick", never as fatal.

use ipcstress_common::{CpuTimes, ProcessError, ProcessResult};
use std::fs;
use std::io::ErrorKind;
use std::sync::OnceLock;

/// Clock ticks per second (`sysconf(_SC_CLK_TCK)`), read once and
/// cached for the lifetime of the harness process.
pub fn ticks_per_second() -> u64 {
    static TICKS: OnceLock<u64> = OnceLock::new();
    *TICKS.get_or_init(|| {
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 {
            hz as u64
        } else {
            // POSIX default when sysconf cannot answer.
            100
        }
    })
}

/// Read the accumulated user/kernel CPU time of a process, in ticks.
pub fn read_cpu_times(pid: u32) -> ProcessResult<CpuTimes> {
    let path = format!("/proc/{}/stat", pid);
    let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProcessError::not_found(pid.to_string()),
        _ => ProcessError::cpu_time_unavailable(pid.to_string(), e.to_string()),
    })?;

    parse_stat_line(&content).ok_or_else(|| {
        ProcessError::cpu_time_unavailable(pid.to_string(), format!("malformed stat line: {}", path))
    })
}

/// Extract utime (field 14) and stime (field 15) from a stat line.
///
/// The comm field may contain spaces and parentheses, so fields are
/// counted from the last `)` rather than from the start of the line.
fn parse_stat_line(line: &str) -> Option<CpuTimes> {
    let rest = &line[line.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    // rest starts at field 3 (state); utime is field 14, stime field 15.
    let user_ticks = fields.nth(11)?.parse().ok()?;
    let system_ticks = fields.next()?.parse().ok()?;
    Some(CpuTimes {
        user_ticks,
        system_ticks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_LINE: &str = "12345 (webproxy) S 1 12345 12345 0 -1 4194304 1107 0 0 0 \
                             428 37 0 0 20 0 8 0 1585487 22421504 697 18446744073709551615 \
                             1 1 0 0 0 0 0 0 0 0 0 0 17 3 0 0 0 0 0";

    #[test]
    fn test_parse_stat_line() {
        let times = parse_stat_line(STAT_LINE).unwrap();
        assert_eq!(times.user_ticks, 428);
        assert_eq!(times.system_ticks, 37);
    }

    #[test]
    fn test_parse_stat_line_with_spaces_in_comm() {
        let line = "999 (Web Content (x)) R 1 999 999 0 -1 4194304 0 0 0 0 \
                    12 7 0 0 20 0 1 0 100 1000 10 18446744073709551615 \
                    0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        let times = parse_stat_line(line).unwrap();
        assert_eq!(times.user_ticks, 12);
        assert_eq!(times.system_ticks, 7);
    }

    #[test]
    fn test_parse_truncated_line() {
        assert!(parse_stat_line("123 (short) S 1 2 3").is_none());
        assert!(parse_stat_line("no comm field here").is_none());
    }

    #[test]
    fn test_ticks_per_second_is_positive_and_stable() {
        let first = ticks_per_second();
        assert!(first > 0);
        assert_eq!(first, ticks_per_second());
    }

    #[test]
    fn test_read_own_cpu_times() {
        let times = read_cpu_times(std::process::id()).unwrap();
        // Accumulated ticks only ever grow.
        let later = read_cpu_times(std::process::id()).unwrap();
        assert!(later.user_ticks >= times.user_ticks);
        assert!(later.system_ticks >= times.system_ticks);
    }

    #[test]
    fn test_read_exited_process_reports_not_found() {
        let mut child = std::process::Command::new("/bin/true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let err = read_cpu_times(pid).unwrap_err();
        assert!(err.is_not_found());
    }
}
