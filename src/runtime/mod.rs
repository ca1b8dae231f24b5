//! OCI runtime collaboration
//!
//! Config generation and runtime invocation used by the namespace harness.

pub mod generator;
pub mod launcher;

pub use generator::SpecGenerator;
pub use launcher::{ContainerState, OciRuntime, RuntimeLauncher};
