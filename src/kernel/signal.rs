use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
/// Process and process-group termination
/// Used by session release paths; each step tolerates the target already being gone.
use nix::unistd::Pid;

/// What a termination attempt actually did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KillReport {
    /// SIGKILL delivered to the leader process
    pub leader_killed: bool,
    /// SIGKILL delivered to the whole process group
    pub group_killed: bool,
    /// Non-fatal problems encountered on the way
    pub notes: Vec<String>,
}

/// Send SIGKILL to a single process. A vanished process is not an error.
pub fn kill_process(pid: Pid, report: &mut KillReport) {
    match signal::kill(pid, Signal::SIGKILL) {
        Ok(()) => report.leader_killed = true,
        Err(Errno::ESRCH) => {}
        Err(e) => report
            .notes
            .push(format!("SIGKILL to process {} failed: {}", pid, e)),
    }
}

/// Send SIGKILL to every member of a process group.
///
/// Catches descendants the leader forked (e.g. the pid 1 of a freshly
/// unshared pid namespace) that would otherwise be orphaned.
pub fn kill_process_group(pgid: Pid, report: &mut KillReport) {
    match signal::killpg(pgid, Signal::SIGKILL) {
        Ok(()) => report.group_killed = true,
        Err(Errno::ESRCH) => {}
        Err(e) => report
            .notes
            .push(format!("SIGKILL to process group {} failed: {}", pgid, e)),
    }
}

/// Check if a process still exists (zombies included)
pub fn is_process_alive(pid: Pid) -> bool {
    !matches!(signal::kill(pid, None), Err(Errno::ESRCH))
}
