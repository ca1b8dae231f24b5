/// Isolation sessions: placeholder processes living in freshly unshared namespaces
///
/// A session owns its process. Release is idempotent and runs on every exit
/// path through `Drop`: SIGKILL the leader, reap it, then SIGKILL the whole
/// process group so forked descendants (the pid 1 of a new pid namespace)
/// go too.
use crate::config::types::{CheckError, HarnessConfig, Result};
use crate::kernel::namespace::{ns_path, NamespaceKind};
use crate::kernel::signal::{kill_process, kill_process_group, KillReport};
use nix::unistd::Pid;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Launches processes inside new namespaces
pub trait NamespaceSpawner {
    fn spawn(&self, kind: NamespaceKind, options: &[String]) -> Result<IsolationSession>;
}

/// A live placeholder process, released when dropped
#[derive(Debug)]
pub struct IsolationSession {
    child: Child,
    pid: Pid,
    kind: NamespaceKind,
    options: Vec<String>,
    released: bool,
}

impl IsolationSession {
    /// Take ownership of an already started process.
    ///
    /// The child must lead its own process group; release signals the group.
    pub fn from_child(child: Child, kind: NamespaceKind, options: Vec<String>) -> Result<Self> {
        let mut child = child;
        let pid = Pid::from_raw(child.id() as i32);
        match child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => {
                // The leader is gone but what it forked may still hold the group
                let mut report = KillReport::default();
                kill_process_group(pid, &mut report);
                for note in report.notes {
                    log::warn!("{}", note);
                }
                return Err(CheckError::Spawn(format!(
                    "process failed to start: exited early with {}",
                    status
                )));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CheckError::Spawn(format!(
                    "process handle unavailable after start: {}",
                    e
                )));
            }
        }

        log::debug!("isolation session {} started for {} namespace", pid, kind);
        Ok(Self {
            child,
            pid,
            kind,
            options,
            released: false,
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Path other processes use to join this session's namespace
    pub fn namespace_path(&self) -> PathBuf {
        ns_path(self.pid, self.kind, self.kind.launcher_link())
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Kill, reap and group-kill. Later calls are no-ops.
    pub fn release(&mut self) -> KillReport {
        let mut report = KillReport::default();
        if self.released {
            return report;
        }

        kill_process(self.pid, &mut report);
        if let Err(e) = self.child.wait() {
            report
                .notes
                .push(format!("wait for process {} failed: {}", self.pid, e));
        }
        kill_process_group(self.pid, &mut report);
        self.released = true;

        log::debug!("isolation session {} released", self.pid);
        report
    }
}

impl Drop for IsolationSession {
    fn drop(&mut self) {
        let report = self.release();
        for note in report.notes {
            log::warn!("session cleanup: {}", note);
        }
    }
}

/// Spawner backed by util-linux `unshare`.
///
/// Unsharing from this process is not an option: mount namespaces cannot be
/// unshared from a multithreaded program.
#[derive(Debug, Clone)]
pub struct UnshareSpawner {
    unshare_path: PathBuf,
    placeholder_command: Vec<String>,
}

impl UnshareSpawner {
    pub fn new(unshare_path: PathBuf, placeholder_command: Vec<String>) -> Self {
        Self {
            unshare_path,
            placeholder_command,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.unshare_path.clone(),
            config.placeholder_command.clone(),
        )
    }

    /// Full argument vector passed to `unshare`
    pub fn command_args(&self, options: &[String]) -> Vec<String> {
        // --fork so a new pid namespace is populated with a pid 1.
        let mut args = vec!["--fork".to_string()];
        args.extend(options.iter().cloned());
        args.extend(self.placeholder_command.iter().cloned());
        args
    }
}

impl NamespaceSpawner for UnshareSpawner {
    fn spawn(&self, kind: NamespaceKind, options: &[String]) -> Result<IsolationSession> {
        let child = Command::new(&self.unshare_path)
            .args(self.command_args(options))
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| {
                CheckError::Spawn(format!(
                    "cannot run {}: {}",
                    self.unshare_path.display(),
                    e
                ))
            })?;

        IsolationSession::from_child(child, kind, options.to_vec())
    }
}
