//! ocicheck: conformance checks for OCI runtimes and bundles
//!
//! # Architecture
//!
//! ## Compliance ([`compliance`])
//! - [`compliance::level`]: RFC 2119 normative levels and flag parsing
//! - [`compliance::violation`]: Violation records and the compound error
//! - [`compliance::filter`]: Level-threshold filtering
//! - [`compliance::aggregator`]: Rule engine runs folded into one result
//! - [`compliance::rules`]: Bundle-level rules over `config.json`
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::namespace`]: Namespace kinds and identity resolution via `/proc`
//! - [`kernel::poll`]: Bounded-time state polling
//! - [`kernel::signal`]: Process and process-group termination
//!
//! ## Execution Control ([`exec`])
//! - [`exec::spawner`]: Namespace-isolated placeholder processes
//!
//! ## Runtime ([`runtime`])
//! - [`runtime::generator`]: Runtime config generation
//! - [`runtime::launcher`]: Container create/state/delete against a runtime binary
//!
//! ## Reporting ([`report`])
//! - [`report::tap`]: TAP version 13 output
//!
//! ## Conformance Cases ([`testing`])
//! - [`testing::ns_path`]: Type-state enforced namespace-by-path verification
//!
//! # Design Principles
//!
//! 1. **Kernel as truth** - Namespace identity comes from `/proc`, never inferred
//! 2. **Types prevent errors** - Check steps cannot be skipped or reordered
//! 3. **Every process is reaped** - Placeholders and containers are torn down on all paths

// Kernel Primitives
pub mod kernel;

// Execution Control
pub mod exec;

// Compliance filtering
pub mod compliance;

// Runtime collaboration
pub mod runtime;

// Reporting
pub mod report;

// Configuration
pub mod config;

// Conformance cases
pub mod testing;

// CLI entrypoint wiring shared by the ocicheck/linux_ns_path binaries.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
