/// Linux namespace kinds and namespace identity resolution
/// Identity of a namespace is the target of its `/proc/<pid>/ns/<link>` symlink
use crate::config::types::{CheckError, Result};
use nix::unistd::Pid;
use oci_spec::runtime::LinuxNamespaceType;
use std::fmt;
use std::path::PathBuf;

/// Namespace kinds covered by the isolation harness
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Cgroup,
    Ipc,
    Mount,
    Network,
    Pid,
    User,
    Uts,
}

/// Which `/proc/<pid>/ns` entry to read for a process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NsLink {
    /// The namespace the process itself lives in
    Own,
    /// The namespace the process's future children will live in
    ForChildren,
}

impl NamespaceKind {
    /// Fixed catalog, in harness order
    pub const ALL: [NamespaceKind; 7] = [
        NamespaceKind::Cgroup,
        NamespaceKind::Ipc,
        NamespaceKind::Mount,
        NamespaceKind::Network,
        NamespaceKind::Pid,
        NamespaceKind::User,
        NamespaceKind::Uts,
    ];

    /// Kernel link name under `/proc/<pid>/ns/`
    pub fn proc_link(self) -> &'static str {
        match self {
            Self::Cgroup => "cgroup",
            Self::Ipc => "ipc",
            Self::Mount => "mnt",
            Self::Network => "net",
            Self::Pid => "pid",
            Self::User => "user",
            Self::Uts => "uts",
        }
    }

    /// Namespace name used in OCI runtime configs
    pub fn spec_name(self) -> &'static str {
        match self {
            Self::Cgroup => "cgroup",
            Self::Ipc => "ipc",
            Self::Mount => "mount",
            Self::Network => "network",
            Self::Pid => "pid",
            Self::User => "user",
            Self::Uts => "uts",
        }
    }

    /// util-linux `unshare` flag creating this namespace
    pub fn unshare_flag(self) -> &'static str {
        match self {
            Self::Cgroup => "--cgroup",
            Self::Ipc => "--ipc",
            Self::Mount => "--mount",
            Self::Network => "--net",
            Self::Pid => "--pid",
            Self::User => "--user",
            Self::Uts => "--uts",
        }
    }

    pub fn oci_type(self) -> LinuxNamespaceType {
        match self {
            Self::Cgroup => LinuxNamespaceType::Cgroup,
            Self::Ipc => LinuxNamespaceType::Ipc,
            Self::Mount => LinuxNamespaceType::Mount,
            Self::Network => LinuxNamespaceType::Network,
            Self::Pid => LinuxNamespaceType::Pid,
            Self::User => LinuxNamespaceType::User,
            Self::Uts => LinuxNamespaceType::Uts,
        }
    }

    /// Link to read on the process that unshared the namespace.
    ///
    /// Unsharing a pid namespace does not move the caller; only its next
    /// forked child lands in the new namespace, so the launcher must be
    /// observed through `pid_for_children`.
    pub fn launcher_link(self) -> NsLink {
        match self {
            Self::Pid => NsLink::ForChildren,
            _ => NsLink::Own,
        }
    }

    /// `/proc` entry name for the given link variant
    pub fn link_name(self, link: NsLink) -> String {
        match link {
            NsLink::Own => self.proc_link().to_string(),
            NsLink::ForChildren => format!("{}_for_children", self.proc_link()),
        }
    }

    /// Options passed to `unshare` for the harness case of this kind
    pub fn unshare_options(self) -> Vec<String> {
        match self {
            // A user namespace alone cannot be joined by most runtimes without
            // a root mapping, and runc needs a private mount namespace as well.
            Self::User => vec![
                "--user".to_string(),
                "--map-root-user".to_string(),
                "--mount".to_string(),
            ],
            other => vec![other.unshare_flag().to_string()],
        }
    }

    /// Accept a proc link name, a spec name or an unshare flag
    pub fn from_alias(alias: &str) -> Option<Self> {
        let alias = alias.trim_start_matches("--");
        Self::ALL.into_iter().find(|kind| {
            alias == kind.proc_link()
                || alias == kind.spec_name()
                || alias == kind.unshare_flag().trim_start_matches("--")
        })
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proc_link())
    }
}

/// `/proc/<pid>/ns/<link>` path
pub fn ns_path(pid: Pid, kind: NamespaceKind, link: NsLink) -> PathBuf {
    PathBuf::from(format!("/proc/{}/ns/{}", pid, kind.link_name(link)))
}

/// Opaque namespace identity, comparable only for equality within a kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceIdentity {
    kind: NamespaceKind,
    token: String,
}

impl NamespaceIdentity {
    pub fn new(kind: NamespaceKind, token: impl Into<String>) -> Self {
        Self {
            kind,
            token: token.into(),
        }
    }

    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for NamespaceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Resolves namespace identities of processes
pub trait NamespaceResolver {
    fn resolve(&self, pid: Pid, kind: NamespaceKind, link: NsLink) -> Result<NamespaceIdentity>;
}

/// Resolver reading the kernel's `/proc/<pid>/ns` links
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcNamespaceResolver;

impl NamespaceResolver for ProcNamespaceResolver {
    fn resolve(&self, pid: Pid, kind: NamespaceKind, link: NsLink) -> Result<NamespaceIdentity> {
        let path = ns_path(pid, kind, link);
        let target = std::fs::read_link(&path).map_err(|e| {
            CheckError::Namespace(format!(
                "cannot read namespace link {}: {}\n{}",
                path.display(),
                e,
                list_ns_dir(pid)
            ))
        })?;

        Ok(NamespaceIdentity::new(kind, target.to_string_lossy()))
    }
}

/// Render `/proc/<pid>/ns` entries for error messages
fn list_ns_dir(pid: Pid) -> String {
    let dir = PathBuf::from(format!("/proc/{}/ns", pid));
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => return format!("{}: {}", dir.display(), e),
    };

    let mut lines: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let target = std::fs::read_link(entry.path())
                .map(|t| t.to_string_lossy().into_owned())
                .unwrap_or_else(|e| format!("<{}>", e));
            format!("{} -> {}", entry.file_name().to_string_lossy(), target)
        })
        .collect();
    lines.sort();
    format!("{}:\n{}", dir.display(), lines.join("\n"))
}

/// Check whether namespace links are readable on this system
pub fn is_supported() -> bool {
    std::fs::read_dir("/proc/self/ns").is_ok()
}
