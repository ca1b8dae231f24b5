/// Namespace-by-path verification
///
/// Proves that a runtime places the container process in a namespace given by
/// path. Each namespace kind runs the same chain:
///
/// Unspawned -> Spawned -> NamespaceObserved -> RuntimeLaunched -> Verified
///
/// 1. resolve the harness's own identity, then spawn an isolated placeholder
/// 2. poll until the placeholder's identity diverges from the harness
/// 3. launch the runtime with a config joining that namespace by path
/// 4. the container identity must equal the placeholder's and differ from
///    the harness's
///
/// Each step consumes the previous state, so steps cannot be skipped or
/// reordered. A failing step returns a [`CheckFailure`] and drops the
/// session, which releases the placeholder.
use crate::compliance::level::NormativeLevel;
use crate::compliance::violation::{spec_reference, ViolationRecord};
use crate::config::types::{CheckError, HarnessConfig, IdMapping};
use crate::exec::spawner::{IsolationSession, NamespaceSpawner};
use crate::kernel::namespace::{NamespaceIdentity, NamespaceKind, NamespaceResolver, NsLink};
use crate::kernel::poll::{poll_until, PollSettings};
use crate::report::tap::TapWriter;
use crate::runtime::generator::SpecGenerator;
use crate::runtime::launcher::RuntimeLauncher;
use nix::unistd::Pid;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Requirement checked by every namespace-path case
pub const NS_PROC_IN_PATH: &str =
    "The runtime MUST place the container process in the namespace associated with that path.";

/// Violation record attached to a failed namespace-path case
pub fn ns_proc_in_path_violation() -> ViolationRecord {
    ViolationRecord::new(
        NS_PROC_IN_PATH,
        NormativeLevel::Must,
        spec_reference("config-linux.md#namespaces"),
    )
}

/// States of a single namespace-kind check, terminal failures included
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckState {
    Unspawned,
    Spawned,
    NamespaceObserved,
    RuntimeLaunched,
    Verified,
    SpawnFailed,
    ObservationTimeout,
    RuntimeLaunchFailed,
    IdentityCollision,
}

impl CheckState {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::Unspawned | Self::Spawned | Self::NamespaceObserved | Self::RuntimeLaunched
        )
    }
}

/// Result of one namespace-kind check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    Pass,
    Fail(String),
    Timeout { elapsed: Duration, reason: String },
}

impl VerificationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("pass"),
            Self::Fail(reason) => f.write_str(reason),
            Self::Timeout { elapsed, reason } => {
                write!(f, "no isolated namespace after {:?}: {}", elapsed, reason)
            }
        }
    }
}

/// A check that stopped in a failure state
#[derive(Debug)]
pub struct CheckFailure {
    pub state: CheckState,
    pub error: CheckError,
}

impl CheckFailure {
    fn new(state: CheckState, error: CheckError) -> Self {
        Self { state, error }
    }

    pub fn outcome(&self) -> VerificationOutcome {
        match &self.error {
            CheckError::ObservationTimeout { elapsed, reason } => VerificationOutcome::Timeout {
                elapsed: *elapsed,
                reason: reason.clone(),
            },
            other => VerificationOutcome::Fail(other.to_string()),
        }
    }
}

// ============================================================================
// Type-state markers
// ============================================================================

/// Nothing spawned yet
pub struct Unspawned;

/// Placeholder running; namespace not confirmed
pub struct Spawned {
    harness: NamespaceIdentity,
    session: IsolationSession,
}

/// Placeholder confirmed to live in a namespace distinct from the harness
pub struct NamespaceObserved {
    harness: NamespaceIdentity,
    session: IsolationSession,
    isolated: NamespaceIdentity,
}

/// Container process observed inside the runtime
pub struct RuntimeLaunched {
    harness: NamespaceIdentity,
    session: IsolationSession,
    isolated: NamespaceIdentity,
    container: NamespaceIdentity,
}

/// Container joined the placeholder's namespace
pub struct Verified {
    harness: NamespaceIdentity,
    isolated: NamespaceIdentity,
    container: NamespaceIdentity,
}

/// Namespace-path check for one kind, in state `S`
pub struct NsCheck<S> {
    kind: NamespaceKind,
    state: S,
}

impl<S> NsCheck<S> {
    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }
}

impl NsCheck<Unspawned> {
    pub fn new(kind: NamespaceKind) -> Self {
        Self {
            kind,
            state: Unspawned,
        }
    }

    /// Resolve the harness identity, then start the isolated placeholder
    pub fn spawn<R, P>(self, resolver: &R, spawner: &P) -> Result<NsCheck<Spawned>, CheckFailure>
    where
        R: NamespaceResolver,
        P: NamespaceSpawner,
    {
        let harness = resolver
            .resolve(Pid::this(), self.kind, NsLink::Own)
            .map_err(|e| {
                CheckFailure::new(
                    CheckState::SpawnFailed,
                    CheckError::Namespace(format!(
                        "cannot read namespace link for the test process: {}",
                        e
                    )),
                )
            })?;

        let session = spawner
            .spawn(self.kind, &self.kind.unshare_options())
            .map_err(|e| CheckFailure::new(CheckState::SpawnFailed, e))?;

        Ok(NsCheck {
            kind: self.kind,
            state: Spawned { harness, session },
        })
    }
}

impl NsCheck<Spawned> {
    pub fn session(&self) -> &IsolationSession {
        &self.state.session
    }

    /// Identity of the harness process, resolved before spawning
    pub fn harness_identity(&self) -> &NamespaceIdentity {
        &self.state.harness
    }

    /// Poll until the placeholder's namespace differs from the harness's
    pub fn observe<R>(
        self,
        resolver: &R,
        settings: PollSettings,
    ) -> Result<NsCheck<NamespaceObserved>, CheckFailure>
    where
        R: NamespaceResolver,
    {
        let kind = self.kind;
        let Spawned { harness, session } = self.state;
        let pid = session.pid();
        let link = kind.launcher_link();

        let observed = poll_until(settings, || {
            let isolated = resolver.resolve(pid, kind, link).map_err(|e| {
                CheckError::Namespace(format!(
                    "cannot read namespace link for the unshare process: {}",
                    e
                ))
            })?;
            if isolated == harness {
                return Err(CheckError::Namespace(format!(
                    "test namespace {} == unshare namespace {}",
                    harness, isolated
                )));
            }
            Ok(isolated)
        });

        match observed {
            Ok(isolated) => {
                log::debug!("{} namespace isolated as {}", kind, isolated);
                Ok(NsCheck {
                    kind,
                    state: NamespaceObserved {
                        harness,
                        session,
                        isolated,
                    },
                })
            }
            Err(timeout) => {
                let reason = timeout
                    .last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "namespace never observed".to_string());
                Err(CheckFailure::new(
                    CheckState::ObservationTimeout,
                    CheckError::ObservationTimeout {
                        elapsed: timeout.elapsed,
                        reason,
                    },
                ))
            }
        }
    }
}

impl NsCheck<NamespaceObserved> {
    pub fn harness_identity(&self) -> &NamespaceIdentity {
        &self.state.harness
    }

    pub fn isolated_identity(&self) -> &NamespaceIdentity {
        &self.state.isolated
    }

    /// Config for the runtime: join the observed namespace by path
    pub fn runtime_spec(&self, user_mapping: IdMapping) -> crate::config::types::Result<SpecGenerator> {
        let mut generator = SpecGenerator::default();
        let path = self.state.session.namespace_path();
        generator.add_or_replace_namespace(self.kind, Some(&path))?;

        // Joining an existing userns leaves mappings unspecified; most
        // runtimes still need one, and runc cannot mount /dev/pts there.
        if self.kind == NamespaceKind::User {
            generator.add_uid_mapping(user_mapping)?;
            generator.add_gid_mapping(user_mapping)?;
            generator.remove_mount(Path::new("/dev/pts"));
        }
        Ok(generator)
    }

    /// Launch the runtime and resolve the container process's identity
    pub fn launch<R, L>(
        self,
        resolver: &R,
        launcher: &L,
        user_mapping: IdMapping,
    ) -> Result<NsCheck<RuntimeLaunched>, CheckFailure>
    where
        R: NamespaceResolver,
        L: RuntimeLauncher,
    {
        let kind = self.kind;
        let spec = self
            .runtime_spec(user_mapping)
            .map_err(|e| CheckFailure::new(CheckState::RuntimeLaunchFailed, e))?
            .into_spec();

        let container = launcher
            .launch_and_observe(&spec, |_, state| {
                resolver
                    .resolve(Pid::from_raw(state.pid), kind, NsLink::Own)
                    .map_err(|e| {
                        CheckError::RuntimeLaunch(format!(
                            "cannot read namespace link for the container process: {}",
                            e
                        ))
                    })
            })
            .and_then(|identity| identity)
            .map_err(|e| CheckFailure::new(CheckState::RuntimeLaunchFailed, e))?;

        let NamespaceObserved {
            harness,
            session,
            isolated,
        } = self.state;
        Ok(NsCheck {
            kind,
            state: RuntimeLaunched {
                harness,
                session,
                isolated,
                container,
            },
        })
    }
}

impl NsCheck<RuntimeLaunched> {
    pub fn container_identity(&self) -> &NamespaceIdentity {
        &self.state.container
    }

    /// Compare the three observation points and release the placeholder
    pub fn verify(self) -> Result<NsCheck<Verified>, CheckFailure> {
        let RuntimeLaunched {
            harness,
            mut session,
            isolated,
            container,
        } = self.state;
        session.release();

        if container == harness {
            return Err(CheckFailure::new(
                CheckState::IdentityCollision,
                CheckError::IdentityCollision(format!(
                    "test namespace {} == container namespace {}",
                    harness, container
                )),
            ));
        }
        if container != isolated {
            return Err(CheckFailure::new(
                CheckState::IdentityCollision,
                CheckError::IdentityCollision(format!(
                    "container namespace {} != requested namespace {}",
                    container, isolated
                )),
            ));
        }

        Ok(NsCheck {
            kind: self.kind,
            state: Verified {
                harness,
                isolated,
                container,
            },
        })
    }
}

impl NsCheck<Verified> {
    pub fn harness_identity(&self) -> &NamespaceIdentity {
        &self.state.harness
    }

    pub fn isolated_identity(&self) -> &NamespaceIdentity {
        &self.state.isolated
    }

    pub fn container_identity(&self) -> &NamespaceIdentity {
        &self.state.container
    }
}

// ============================================================================
// Orchestration
// ============================================================================

/// Outcome of one catalog entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckReport {
    pub kind: NamespaceKind,
    pub state: CheckState,
    pub outcome: VerificationOutcome,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}

/// Runs namespace-path checks with pluggable kernel and runtime collaborators
pub struct NamespacePathChecker<R, P, L> {
    resolver: R,
    spawner: P,
    launcher: L,
    settings: PollSettings,
    user_mapping: IdMapping,
}

impl<R, P, L> NamespacePathChecker<R, P, L>
where
    R: NamespaceResolver,
    P: NamespaceSpawner,
    L: RuntimeLauncher,
{
    pub fn new(resolver: R, spawner: P, launcher: L) -> Self {
        Self {
            resolver,
            spawner,
            launcher,
            settings: PollSettings::default(),
            user_mapping: IdMapping::default(),
        }
    }

    pub fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_user_mapping(mut self, mapping: IdMapping) -> Self {
        self.user_mapping = mapping;
        self
    }

    pub fn with_config(self, config: &HarnessConfig) -> Self {
        self.with_settings(PollSettings::new(config.poll_timeout(), config.poll_interval()))
            .with_user_mapping(config.user_mapping)
    }

    /// Drive one kind through the full chain
    pub fn check(&self, kind: NamespaceKind) -> CheckReport {
        let result = NsCheck::new(kind)
            .spawn(&self.resolver, &self.spawner)
            .and_then(|c| c.observe(&self.resolver, self.settings))
            .and_then(|c| c.launch(&self.resolver, &self.launcher, self.user_mapping))
            .and_then(|c| c.verify());

        match result {
            Ok(_) => CheckReport {
                kind,
                state: CheckState::Verified,
                outcome: VerificationOutcome::Pass,
            },
            Err(failure) => {
                log::info!("{} namespace check stopped in {:?}: {}", kind, failure.state, failure.error);
                CheckReport {
                    kind,
                    state: failure.state,
                    outcome: failure.outcome(),
                }
            }
        }
    }

    /// Check every kind in the catalog; one failure never stops the rest
    pub fn check_all(&self) -> Vec<CheckReport> {
        NamespaceKind::ALL.iter().map(|kind| self.check(*kind)).collect()
    }
}

/// YAML diagnostic emitted after a failed case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseDiagnostic {
    pub actual: String,
    pub expected: String,
    #[serde(rename = "namespace type")]
    pub namespace_type: String,
    pub level: String,
    pub reference: String,
}

impl CaseDiagnostic {
    pub fn for_report(report: &CheckReport) -> Self {
        let violation = ns_proc_in_path_violation();
        Self {
            actual: format!("err == {}", report.outcome),
            expected: "err == nil".to_string(),
            namespace_type: report.kind.to_string(),
            level: violation.level().to_string(),
            reference: violation.reference().to_string(),
        }
    }
}

/// TAP description of one case
pub fn case_description(kind: NamespaceKind) -> String {
    format!("set {} namespace by path", kind)
}

/// Emit one test point, followed by a diagnostic block when it failed
pub fn write_case<W: Write>(tap: &mut TapWriter<W>, report: &CheckReport) -> io::Result<()> {
    tap.ok(report.passed(), &case_description(report.kind))?;
    if !report.passed() {
        tap.yaml(&CaseDiagnostic::for_report(report))?;
    }
    Ok(())
}

/// Run every catalog kind and stream the results as TAP
///
/// Off Linux each case is skipped. The plan line comes last.
pub fn run_harness<R, P, L, W>(checker: &NamespacePathChecker<R, P, L>, out: W) -> io::Result<W>
where
    R: NamespaceResolver,
    P: NamespaceSpawner,
    L: RuntimeLauncher,
    W: Write,
{
    let mut tap = TapWriter::new(out);
    tap.header()?;

    for kind in NamespaceKind::ALL {
        if !cfg!(target_os = "linux") {
            tap.skip(1, &format!("linux-specific namespace test: {}", kind))?;
            continue;
        }
        let report = checker.check(kind);
        write_case(&mut tap, &report)?;
    }

    tap.auto_plan()?;
    Ok(tap.into_inner())
}
