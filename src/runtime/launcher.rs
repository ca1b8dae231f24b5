//! Runtime invocation: create a container from a generated config, hand its
//! state to an observer, then tear it down.

use crate::config::types::{CheckError, HarnessConfig, Result};
use crate::kernel::poll::{poll_until, PollSettings};
use crate::runtime::generator::SpecGenerator;
use oci_spec::runtime::Spec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use uuid::Uuid;

/// Container state as reported by `<runtime> state <id>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    pub oci_version: String,
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub pid: i32,
    #[serde(default)]
    pub bundle: PathBuf,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl ContainerState {
    /// The container process exists (created or running)
    pub fn has_process(&self) -> bool {
        matches!(self.status.as_str(), "created" | "running") && self.pid > 0
    }
}

/// Launches a container and lets the caller inspect it while it exists.
pub trait RuntimeLauncher {
    /// `Err` means the container could not be brought up; the observer's
    /// own result is returned untouched in `Ok`.
    fn launch_and_observe<T, F>(&self, spec: &Spec, observer: F) -> Result<T>
    where
        F: FnOnce(&Spec, &ContainerState) -> T;
}

/// Launcher driving an OCI runtime binary (runc, crun, youki, ...)
#[derive(Debug, Clone)]
pub struct OciRuntime {
    binary: String,
    rootfs: PathBuf,
    settings: PollSettings,
}

impl OciRuntime {
    pub fn new(binary: impl Into<String>, rootfs: PathBuf, settings: PollSettings) -> Self {
        Self {
            binary: binary.into(),
            rootfs,
            settings,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.runtime.clone(),
            config.rootfs.clone(),
            PollSettings::new(config.poll_timeout(), config.poll_interval()),
        )
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn create(&self, bundle: &std::path::Path, id: &str) -> Result<()> {
        // The container init inherits stdio; pipes here would keep `output()`
        // waiting for the container to exit.
        let status = Command::new(&self.binary)
            .arg("create")
            .arg("--bundle")
            .arg(bundle)
            .arg(id)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| CheckError::RuntimeLaunch(format!("cannot run {}: {}", self.binary, e)))?;

        if !status.success() {
            return Err(CheckError::RuntimeLaunch(format!(
                "{} create {} failed with {}",
                self.binary, id, status
            )));
        }
        Ok(())
    }

    fn state(&self, id: &str) -> Result<ContainerState> {
        let output = Command::new(&self.binary)
            .arg("state")
            .arg(id)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CheckError::RuntimeLaunch(format!("cannot run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(CheckError::RuntimeLaunch(format!(
                "{} state {} failed: {}",
                self.binary,
                id,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            CheckError::RuntimeLaunch(format!("cannot parse state of {}: {}", id, e))
        })
    }

    fn run_quiet(&self, args: &[&str]) -> std::result::Result<(), String> {
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| e.to_string())?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }

    fn resolve_rootfs(&self) -> Result<PathBuf> {
        let rootfs = if self.rootfs.is_absolute() {
            self.rootfs.clone()
        } else {
            std::env::current_dir()?.join(&self.rootfs)
        };
        if !rootfs.is_dir() {
            return Err(CheckError::RuntimeLaunch(format!(
                "rootfs {} is not a directory",
                rootfs.display()
            )));
        }
        Ok(rootfs)
    }
}

/// Kills and deletes a created container when dropped
struct ContainerGuard<'a> {
    runtime: &'a OciRuntime,
    id: String,
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.runtime.run_quiet(&["kill", &self.id, "KILL"]) {
            log::debug!("kill of container {} reported: {}", self.id, e);
        }
        match self.runtime.run_quiet(&["delete", "--force", &self.id]) {
            Ok(()) => log::debug!("container {} deleted", self.id),
            Err(e) => log::warn!("failed to delete container {}: {}", self.id, e),
        }
    }
}

impl RuntimeLauncher for OciRuntime {
    fn launch_and_observe<T, F>(&self, spec: &Spec, observer: F) -> Result<T>
    where
        F: FnOnce(&Spec, &ContainerState) -> T,
    {
        let bundle = tempfile::Builder::new().prefix("ocicheck-bundle-").tempdir()?;

        let mut generator = SpecGenerator::from_spec(spec.clone());
        generator.set_root_path(self.resolve_rootfs()?)?;
        let spec = generator.into_spec();
        spec.save(bundle.path().join("config.json"))?;

        let id = format!("ocicheck-{}", Uuid::new_v4());
        log::info!("creating container {} with {}", id, self.binary);
        self.create(bundle.path(), &id)?;
        let _guard = ContainerGuard {
            runtime: self,
            id: id.clone(),
        };

        let state = poll_until(self.settings, || {
            let state = self.state(&id)?;
            if state.has_process() {
                Ok(state)
            } else {
                Err(CheckError::RuntimeLaunch(format!(
                    "container {} is {:?} with pid {}",
                    id, state.status, state.pid
                )))
            }
        })
        .map_err(|timeout| CheckError::RuntimeLaunch(timeout.to_string()))?;

        Ok(observer(&spec, &state))
    }
}
