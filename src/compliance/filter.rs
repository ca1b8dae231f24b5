//! Compliance filtering: fold raw rule-engine errors into one compound result.

use super::level::NormativeLevel;
use super::violation::{CompoundError, ValidationError, ViolationRecord};

/// Result of filtering a batch of validation errors against a threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Retained errors, `None` when nothing reached the threshold
    pub error: Option<CompoundError>,
    /// Violations dropped for being below the threshold, in input order
    pub suppressed: Vec<ViolationRecord>,
}

impl FilterOutcome {
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Keep errors at or above `threshold`, preserving relative order.
///
/// Nothing is logged here; suppressed records are handed back so the caller
/// can report them.
pub fn filter<I>(errors: I, threshold: NormativeLevel) -> FilterOutcome
where
    I: IntoIterator<Item = ValidationError>,
{
    let mut retained = Vec::new();
    let mut suppressed = Vec::new();

    for error in errors {
        if error.is_suppressed_at(threshold) {
            if let ValidationError::Violation(record) = error {
                suppressed.push(record);
            }
        } else {
            retained.push(error);
        }
    }

    FilterOutcome {
        error: CompoundError::from_errors(retained),
        suppressed,
    }
}
