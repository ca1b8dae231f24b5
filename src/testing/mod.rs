//! Runtime conformance cases
//!
//! Live checks that drive a real OCI runtime against kernel state.

pub mod ns_path;

pub use ns_path::{
    run_harness, CheckReport, CheckState, NamespacePathChecker, NsCheck, VerificationOutcome,
};
