//! Execution control
//!
//! Spawning and releasing namespace-isolated placeholder processes.

pub mod spawner;

pub use spawner::{IsolationSession, NamespaceSpawner, UnshareSpawner};
