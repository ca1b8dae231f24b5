//! Test-protocol output

pub mod tap;

pub use tap::TapWriter;
