//! Configuration
//!
//! Harness configuration loading and the crate-wide error type.

pub mod types;
