//! Integration tests against the live kernel
//!
//! These need util-linux `unshare` and permission to create namespaces.
//! When either is missing the test prints a note and returns.

use nix::unistd::Pid;
use ocicheck::config::types::HarnessConfig;
use ocicheck::exec::spawner::{NamespaceSpawner, UnshareSpawner};
use ocicheck::kernel::namespace::{
    is_supported, NamespaceKind, NamespaceResolver, NsLink, ProcNamespaceResolver,
};
use ocicheck::kernel::poll::{poll_until, PollSettings};
use ocicheck::kernel::signal::is_process_alive;
use std::time::Duration;

fn unshare_spawner() -> Option<UnshareSpawner> {
    if !cfg!(target_os = "linux") || !is_supported() {
        println!("namespace links unavailable, skipping");
        return None;
    }
    let config = HarnessConfig::default();
    if !config.unshare_path.exists() {
        println!("{} not found, skipping", config.unshare_path.display());
        return None;
    }
    Some(UnshareSpawner::from_config(&config))
}

/// unshare that failed to set up namespaces lingers as an unreaped zombie
fn has_exited(pid: Pid) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map_or(false, |rest| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

#[test]
fn test_harness_identity_is_stable() {
    if !is_supported() {
        return;
    }
    let resolver = ProcNamespaceResolver;
    for kind in NamespaceKind::ALL {
        // Older kernels lack some links (cgroup before 4.6)
        let Ok(first) = resolver.resolve(Pid::this(), kind, NsLink::Own) else {
            continue;
        };
        let second = resolver.resolve(Pid::this(), kind, NsLink::Own).unwrap();
        assert_eq!(first, second);
        assert!(first.token().starts_with(kind.proc_link()));
    }
}

#[test]
fn test_mount_namespace_diverges_from_harness() {
    let spawner = match unshare_spawner() {
        Some(spawner) => spawner,
        None => return,
    };
    let resolver = ProcNamespaceResolver;
    let kind = NamespaceKind::Mount;
    let harness = resolver.resolve(Pid::this(), kind, NsLink::Own).unwrap();

    // A user namespace lets unprivileged runs create the mount namespace too.
    let options = NamespaceKind::User.unshare_options();
    let mut session = match spawner.spawn(kind, &options) {
        Ok(session) => session,
        Err(e) => {
            println!("unshare unusable ({}), skipping", e);
            return;
        }
    };

    let settings = PollSettings::new(Duration::from_secs(3), Duration::from_millis(100));
    let observed = poll_until(settings, || {
        let identity = resolver.resolve(session.pid(), kind, kind.launcher_link())?;
        if identity == harness {
            return Err(ocicheck::CheckError::Namespace("not isolated yet".to_string()));
        }
        Ok(identity)
    });

    match observed {
        Ok(identity) => assert_ne!(identity, harness),
        Err(timeout) => {
            if has_exited(session.pid()) {
                println!("unshare exited early, skipping: {}", timeout);
                return;
            }
            panic!("mount namespace never diverged: {}", timeout);
        }
    }

    let pid = session.pid();
    let report = session.release();
    assert!(report.notes.is_empty(), "{:?}", report.notes);
    assert!(!is_process_alive(pid));
}

#[test]
fn test_release_is_idempotent_for_live_session() {
    let spawner = match unshare_spawner() {
        Some(spawner) => spawner,
        None => return,
    };
    let mut session = match spawner.spawn(NamespaceKind::Uts, &NamespaceKind::User.unshare_options()) {
        Ok(session) => session,
        Err(e) => {
            println!("unshare unusable ({}), skipping", e);
            return;
        }
    };

    session.release();
    assert!(session.is_released());
    let second = session.release();
    assert!(second.notes.is_empty());
}
