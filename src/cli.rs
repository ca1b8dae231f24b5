use crate::compliance::{BundleValidator, NormativeLevel, RuleEngine, ValidationAggregator};
use crate::config::types::HarnessConfig;
use crate::exec::spawner::UnshareSpawner;
use crate::kernel::namespace::ProcNamespaceResolver;
use crate::runtime::launcher::OciRuntime;
use crate::testing::ns_path::{run_harness, NamespacePathChecker};
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

/// Log filter used when `RUST_LOG` is unset; level fallbacks and
/// suppressed violations are reported at warn.
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CliMode {
    /// Every subcommand; no default
    Ocicheck,
    /// Namespace-path harness only; runs it when no subcommand is given
    NsPath,
}

impl CliMode {
    fn primary_binary(self) -> &'static str {
        match self {
            Self::Ocicheck => "ocicheck",
            Self::NsPath => "linux_ns_path",
        }
    }

    fn default_command(self) -> Option<Commands> {
        match self {
            Self::Ocicheck => None,
            Self::NsPath => Some(Commands::NsPath),
        }
    }

    fn allows(self, command: &Commands) -> bool {
        match self {
            Self::Ocicheck => true,
            Self::NsPath => matches!(command, Commands::NsPath),
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Generate host-specific configs or do host-specific validations
    #[arg(long, global = true)]
    host_specific: bool,
    /// Compliance level (may, should or must)
    #[arg(long, global = true, default_value = "must")]
    compliance_level: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Debug, Eq, PartialEq)]
enum Commands {
    /// Validate an OCI bundle
    Validate {
        /// Path to bundle
        #[arg(long, default_value = ".")]
        path: PathBuf,
        /// Platform the bundle targets (linux, solaris or windows)
        #[arg(long, default_value = "linux")]
        platform: String,
    },
    /// Check that the runtime joins namespaces given by path (TAP output)
    NsPath,
}

/// `RUST_LOG`/`RUST_LOG_STYLE`, defaulting to [`DEFAULT_LOG_FILTER`]
pub fn log_env() -> env_logger::Env<'static> {
    env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER)
}

pub fn run(mode: CliMode) -> Result<()> {
    env_logger::Builder::from_env(log_env()).init();

    let cli = Cli::parse();
    let command = match cli.command.clone().or_else(|| mode.default_command()) {
        Some(command) => command,
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    if !mode.allows(&command) {
        anyhow::bail!("{:?} is not available in {}", command, mode.primary_binary());
    }

    match command {
        Commands::Validate { path, platform } => {
            let level = resolve_compliance_level(&cli.compliance_level);
            let validator = BundleValidator::from_path(&path, cli.host_specific, &platform)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            validate_with(&validator, level, &mut out)
        }
        Commands::NsPath => run_ns_path(),
    }
}

/// Parse the `--compliance-level` flag, falling back to MUST
pub fn resolve_compliance_level(input: &str) -> NormativeLevel {
    let (level, malformed) = NormativeLevel::parse_or_strictest(input);
    if let Some(err) = malformed {
        log::warn!("{}, using 'MUST' by default.", err);
    }
    level
}

/// Run `engine`, report suppressed violations and fail on retained ones
pub fn validate_with<W: Write>(
    engine: &dyn RuleEngine,
    level: NormativeLevel,
    out: &mut W,
) -> Result<()> {
    let outcome = ValidationAggregator::new(engine, level).run()?;
    for record in &outcome.suppressed {
        log::warn!("{}", record);
    }
    if let Some(err) = outcome.error {
        return Err(err.into());
    }

    writeln!(out, "Bundle validation succeeded.")?;
    Ok(())
}

fn run_ns_path() -> Result<()> {
    let config = HarnessConfig::load()?;
    log::info!("testing runtime {} with rootfs {}", config.runtime, config.rootfs.display());

    let checker = NamespacePathChecker::new(
        ProcNamespaceResolver,
        UnshareSpawner::from_config(&config),
        OciRuntime::from_config(&config),
    )
    .with_config(&config);

    let stdout = io::stdout();
    let mut out = run_harness(&checker, stdout.lock())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Metadata};

    #[test]
    fn test_default_log_filter_admits_warnings() {
        // Same default as log_env(), read from a variable that is never set
        let env = env_logger::Env::new()
            .filter("OCICHECK_TEST_UNSET_LOG")
            .default_filter_or(DEFAULT_LOG_FILTER);
        let logger = env_logger::Builder::from_env(env).build();

        assert_eq!(logger.filter(), LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).target("ocicheck").build();
        let info = Metadata::builder().level(Level::Info).target("ocicheck").build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }

    #[test]
    fn test_compliance_level_defaults_to_must() {
        let cli = Cli::try_parse_from(["ocicheck", "validate"]).unwrap();
        assert_eq!(cli.compliance_level, "must");
        assert!(!cli.host_specific);
        assert_eq!(
            cli.command,
            Some(Commands::Validate {
                path: PathBuf::from("."),
                platform: "linux".to_string(),
            })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ocicheck",
            "validate",
            "--path",
            "/bundle",
            "--host-specific",
            "--compliance-level",
            "should",
        ])
        .unwrap();
        assert!(cli.host_specific);
        assert_eq!(resolve_compliance_level(&cli.compliance_level), NormativeLevel::Should);
    }

    #[test]
    fn test_unknown_level_falls_back_to_must() {
        assert_eq!(resolve_compliance_level("sometimes"), NormativeLevel::Must);
    }

    #[test]
    fn test_mode_gating() {
        let validate = Commands::Validate {
            path: PathBuf::from("."),
            platform: "linux".to_string(),
        };
        assert!(CliMode::Ocicheck.allows(&validate));
        assert!(!CliMode::NsPath.allows(&validate));
        assert_eq!(CliMode::NsPath.default_command(), Some(Commands::NsPath));
        assert_eq!(CliMode::Ocicheck.default_command(), None);
    }
}
