/// Core types and structures shared by the validator and the namespace harness
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the OCI runtime binary under test
pub const RUNTIME_ENV: &str = "RUNTIME";

/// Environment variable naming the root filesystem used for test bundles
pub const ROOTFS_ENV: &str = "RUNTIME_ROOTFS";

/// Environment variable pointing at a JSON harness configuration file
pub const CONFIG_ENV: &str = "OCICHECK_CONFIG";

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ocicheck.json";

/// Upper bound for a single namespace observation (one hour)
pub const MAX_POLL_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// Id mapping applied to generated specs when joining a user namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    pub host_id: u32,
    pub container_id: u32,
    pub size: u32,
}

impl Default for IdMapping {
    fn default() -> Self {
        // One subordinate range mapped onto container root.
        Self {
            host_id: 1000,
            container_id: 0,
            size: 1000,
        }
    }
}

/// Namespace harness configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// OCI runtime binary (name on PATH or absolute path)
    pub runtime: String,
    /// util-linux unshare binary used to create isolated placeholder processes
    pub unshare_path: PathBuf,
    /// Root filesystem directory for generated bundles
    pub rootfs: PathBuf,
    /// Long-lived command run inside the isolated namespaces
    pub placeholder_command: Vec<String>,
    /// Overall budget for namespace observation
    pub poll_timeout_ms: u64,
    /// Interval between namespace observations
    pub poll_interval_ms: u64,
    /// uid/gid mapping used for user namespace cases
    pub user_mapping: IdMapping,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runtime: "runc".to_string(),
            unshare_path: PathBuf::from("/usr/bin/unshare"),
            rootfs: PathBuf::from("rootfs"),
            placeholder_command: vec!["sleep".to_string(), "10000".to_string()],
            poll_timeout_ms: 3000,
            poll_interval_ms: 200,
            user_mapping: IdMapping::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CheckError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| CheckError::Config(format!("Failed to parse config JSON: {}", e)))
    }

    /// Resolve configuration: `$OCICHECK_CONFIG`, then `./ocicheck.json`,
    /// then built-in defaults, with `RUNTIME`/`RUNTIME_ROOTFS` applied last.
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_ENV) {
            Self::load_from_file(path)?
        } else if Path::new(DEFAULT_CONFIG_FILE).is_file() {
            Self::load_from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(runtime) = lookup(RUNTIME_ENV).filter(|v| !v.is_empty()) {
            self.runtime = runtime;
        }
        if let Some(rootfs) = lookup(ROOTFS_ENV).filter(|v| !v.is_empty()) {
            self.rootfs = PathBuf::from(rootfs);
        }
    }

    /// Reject configurations the harness cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.runtime.trim().is_empty() {
            return Err(CheckError::Config("runtime must not be empty".to_string()));
        }
        if self.placeholder_command.is_empty() {
            return Err(CheckError::Config(
                "placeholder_command must not be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(CheckError::Config(
                "poll_interval_ms cannot be zero".to_string(),
            ));
        }
        if self.poll_timeout_ms > MAX_POLL_TIMEOUT_MS {
            return Err(CheckError::Config(format!(
                "poll_timeout_ms ({}) exceeds the maximum of {}",
                self.poll_timeout_ms, MAX_POLL_TIMEOUT_MS
            )));
        }
        if self.poll_interval_ms > self.poll_timeout_ms {
            return Err(CheckError::Config(format!(
                "poll_interval_ms ({}) must be <= poll_timeout_ms ({})",
                self.poll_interval_ms, self.poll_timeout_ms
            )));
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Error types for the checker
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Namespace error: {0}")]
    Namespace(String),

    #[error("Namespace observation timed out after {elapsed:?}: {reason}")]
    ObservationTimeout { elapsed: Duration, reason: String },

    #[error("Namespace identity collision: {0}")]
    IdentityCollision(String),

    #[error("Runtime launch error: {0}")]
    RuntimeLaunch(String),

    #[error("OCI spec error: {0}")]
    Spec(#[from] oci_spec::OciSpecError),

    #[error("Bundle error: {0}")]
    Bundle(String),
}

/// Result type alias for checker operations
pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_values() {
        let config = HarnessConfig::default();
        assert_eq!(config.runtime, "runc");
        assert_eq!(config.poll_timeout(), Duration::from_secs(3));
        assert_eq!(config.poll_interval(), Duration::from_millis(200));
        assert_eq!(config.user_mapping.host_id, 1000);
        assert_eq!(config.user_mapping.container_id, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_runtime_and_rootfs() {
        let env: HashMap<&str, &str> =
            [(RUNTIME_ENV, "crun"), (ROOTFS_ENV, "/srv/rootfs")].into_iter().collect();
        let mut config = HarnessConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.runtime, "crun");
        assert_eq!(config.rootfs, PathBuf::from("/srv/rootfs"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = HarnessConfig::default();
        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.runtime, "runc");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: HarnessConfig =
            serde_json::from_str(r#"{"runtime": "youki", "poll_timeout_ms": 5000}"#).unwrap();
        assert_eq!(config.runtime, "youki");
        assert_eq!(config.poll_timeout_ms, 5000);
        assert_eq!(config.poll_interval_ms, 200);
    }

    #[test]
    fn validate_rejects_interval_above_timeout() {
        let config = HarnessConfig {
            poll_timeout_ms: 100,
            poll_interval_ms: 200,
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(CheckError::Config(_))));
    }

    #[test]
    fn validate_rejects_unbounded_timeout() {
        let config = HarnessConfig {
            poll_timeout_ms: u64::MAX,
            ..HarnessConfig::default()
        };
        match config.validate() {
            Err(CheckError::Config(msg)) => assert!(msg.contains("poll_timeout_ms")),
            other => panic!("unexpected result {:?}", other),
        }

        let config = HarnessConfig {
            poll_timeout_ms: MAX_POLL_TIMEOUT_MS,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = HarnessConfig {
            poll_interval_ms: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_missing_file_is_config_error() {
        let err = HarnessConfig::load_from_file("/nonexistent/ocicheck.json").unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));
    }
}
