//! Bundle rule engine.
//!
//! The aggregator only depends on [`RuleEngine`]; [`BundleValidator`] is the
//! engine behind the `validate` command and checks bundle-level rules of the
//! runtime config.

use super::level::NormativeLevel;
use super::violation::{spec_reference, ValidationError, ViolationRecord};
use crate::config::types::{CheckError, Result};
use oci_spec::runtime::{LinuxNamespaceType, Spec};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Platforms a bundle may target
pub const SUPPORTED_PLATFORMS: &[&str] = &["linux", "windows", "solaris"];

const SEMVER_PATTERN: &str = r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$";

/// Source of raw validation errors.
pub trait RuleEngine {
    /// Run every rule; `Err` means the engine itself could not run.
    fn run_all_checks(&self) -> Result<Vec<ValidationError>>;
}

/// Rule engine for an on-disk bundle
pub struct BundleValidator {
    bundle: PathBuf,
    spec: Spec,
    host_specific: bool,
    platform: String,
}

impl BundleValidator {
    /// Load `<bundle>/config.json`. A missing or unparsable config is fatal.
    pub fn from_path<P: AsRef<Path>>(bundle: P, host_specific: bool, platform: &str) -> Result<Self> {
        if !SUPPORTED_PLATFORMS.contains(&platform) {
            return Err(CheckError::Config(format!(
                "platform {:?} is not supported, expected one of {:?}",
                platform, SUPPORTED_PLATFORMS
            )));
        }

        let bundle = bundle.as_ref().to_path_buf();
        let config_path = bundle.join("config.json");
        let spec = Spec::load(&config_path).map_err(|e| {
            CheckError::Bundle(format!(
                "cannot load runtime config {}: {}",
                config_path.display(),
                e
            ))
        })?;

        Ok(Self::from_spec(bundle, spec, host_specific, platform))
    }

    /// Build a validator around an already-loaded spec
    pub fn from_spec(bundle: PathBuf, spec: Spec, host_specific: bool, platform: &str) -> Self {
        Self {
            bundle,
            spec,
            host_specific,
            platform: platform.to_string(),
        }
    }

    fn check_version(&self, out: &mut Vec<ValidationError>) {
        let pattern = match Regex::new(SEMVER_PATTERN) {
            Ok(re) => re,
            Err(e) => {
                out.push(ValidationError::Unclassified(format!(
                    "version pattern failed to compile: {}",
                    e
                )));
                return;
            }
        };

        if !pattern.is_match(self.spec.version()) {
            out.push(violation(
                format!(
                    "ociVersion {:?} is not a SemVer v2.0.0 version",
                    self.spec.version()
                ),
                NormativeLevel::Must,
                "config.md#specification-version",
            ));
        }
    }

    fn check_root(&self, out: &mut Vec<ValidationError>) {
        let root = match self.spec.root() {
            Some(root) => root,
            None => {
                if self.platform != "windows" {
                    out.push(violation(
                        "root is required on this platform",
                        NormativeLevel::Must,
                        "config.md#root",
                    ));
                }
                return;
            }
        };

        if !self.host_specific {
            return;
        }

        let path = if root.path().is_absolute() {
            root.path().clone()
        } else {
            self.bundle.join(root.path())
        };
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => out.push(violation(
                format!("root.path {} is not a directory", path.display()),
                NormativeLevel::Must,
                "config.md#root",
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => out.push(violation(
                format!("root.path {} does not exist", path.display()),
                NormativeLevel::Must,
                "config.md#root",
            )),
            Err(e) => out.push(ValidationError::Unclassified(format!(
                "cannot stat root.path {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn check_process(&self, out: &mut Vec<ValidationError>) {
        let Some(process) = self.spec.process() else {
            return;
        };

        if !process.cwd().is_absolute() {
            out.push(violation(
                format!("process.cwd {} is not an absolute path", process.cwd().display()),
                NormativeLevel::Must,
                "config.md#process",
            ));
        }

        if process.args().as_ref().map_or(true, |args| args.is_empty()) {
            out.push(violation(
                "process.args must contain at least one entry",
                NormativeLevel::Must,
                "config.md#process",
            ));
        }
    }

    fn check_mounts(&self, out: &mut Vec<ValidationError>) {
        for mount in self.spec.mounts().iter().flatten() {
            if !mount.destination().is_absolute() {
                out.push(violation(
                    format!(
                        "mount destination {} is not an absolute path",
                        mount.destination().display()
                    ),
                    NormativeLevel::Must,
                    "config.md#mounts",
                ));
            }
        }
    }

    fn check_annotations(&self, out: &mut Vec<ValidationError>) {
        for key in self.spec.annotations().iter().flat_map(|a| a.keys()) {
            if key.is_empty() {
                out.push(violation(
                    "annotation keys must be non-empty",
                    NormativeLevel::Must,
                    "config.md#annotations",
                ));
            } else if !key.contains('.') {
                out.push(violation(
                    format!("annotation key {:?} is not in reverse domain notation", key),
                    NormativeLevel::Should,
                    "config.md#annotations",
                ));
            }
        }
    }

    fn check_linux_namespaces(&self, out: &mut Vec<ValidationError>) {
        if self.platform != "linux" {
            return;
        }
        let namespaces = self
            .spec
            .linux()
            .as_ref()
            .and_then(|linux| linux.namespaces().clone())
            .unwrap_or_default();

        let mut seen = HashSet::new();
        for ns in &namespaces {
            if !seen.insert(ns.typ()) {
                out.push(violation(
                    format!("namespace type {:?} is specified more than once", ns.typ()),
                    NormativeLevel::Must,
                    "config-linux.md#namespaces",
                ));
            }

            if let (true, Some(path)) = (self.host_specific, ns.path()) {
                if !path.exists() {
                    out.push(violation(
                        format!("namespace path {} does not exist", path.display()),
                        NormativeLevel::Must,
                        "config-linux.md#namespaces",
                    ));
                }
            }
        }

        if self.spec.hostname().is_some() && !seen.contains(&LinuxNamespaceType::Uts) {
            out.push(violation(
                "hostname is set but the container does not get its own UTS namespace",
                NormativeLevel::Should,
                "config.md#hostname",
            ));
        }
    }
}

impl RuleEngine for BundleValidator {
    fn run_all_checks(&self) -> Result<Vec<ValidationError>> {
        let mut errors = Vec::new();
        self.check_version(&mut errors);
        self.check_root(&mut errors);
        self.check_process(&mut errors);
        self.check_mounts(&mut errors);
        self.check_annotations(&mut errors);
        self.check_linux_namespaces(&mut errors);

        log::debug!(
            "bundle {} produced {} raw validation errors",
            self.bundle.display(),
            errors.len()
        );
        Ok(errors)
    }
}

fn violation(message: impl Into<String>, level: NormativeLevel, section: &str) -> ValidationError {
    ViolationRecord::new(message, level, spec_reference(section)).into()
}
