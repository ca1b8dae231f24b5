//! Thin wrappers around Linux kernel primitives.
//!
//! Dependency direction: poll -> signal -> namespace

pub mod namespace;
pub mod poll;
pub mod signal;
