//! Compliance levels and error aggregation
//!
//! Rule engines report every violation they find; the aggregator folds them
//! into one [`violation::CompoundError`] filtered by normative level.

pub mod aggregator;
pub mod filter;
pub mod level;
pub mod rules;
pub mod violation;

pub use aggregator::ValidationAggregator;
pub use filter::{filter, FilterOutcome};
pub use level::{MalformedLevel, NormativeLevel};
pub use rules::{BundleValidator, RuleEngine};
pub use violation::{CompoundError, ValidationError, ViolationRecord};
