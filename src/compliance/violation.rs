//! Violation records and the compound error that aggregates them.

use super::level::NormativeLevel;
use serde::Serialize;
use std::fmt;

/// Runtime-spec version used when building section references
pub const RUNTIME_SPEC_VERSION: &str = "1.0.2";

/// Build a URL reference to a runtime-spec document section
pub fn spec_reference(section: &str) -> String {
    format!(
        "https://github.com/opencontainers/runtime-spec/blob/v{}/{}",
        RUNTIME_SPEC_VERSION, section
    )
}

/// A single specification violation reported by a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    message: String,
    level: NormativeLevel,
    reference: String,
}

impl ViolationRecord {
    pub fn new(
        message: impl Into<String>,
        level: NormativeLevel,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            level,
            reference: reference.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> NormativeLevel {
        self.level
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Display for ViolationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({})", self.message, self.level, self.reference)
    }
}

/// An error item produced while running the rule engine.
///
/// Only `Violation` carries a normative level; anything else the engine
/// yields is kept as `Unclassified` and is never suppressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    Violation(ViolationRecord),
    Unclassified(String),
}

impl ValidationError {
    /// Suppression decision for a threshold. Unclassified errors fail open.
    pub fn is_suppressed_at(&self, threshold: NormativeLevel) -> bool {
        match self {
            Self::Violation(record) => record.level() < threshold,
            Self::Unclassified(_) => false,
        }
    }

    pub fn as_violation(&self) -> Option<&ViolationRecord> {
        match self {
            Self::Violation(record) => Some(record),
            Self::Unclassified(_) => None,
        }
    }
}

impl From<ViolationRecord> for ValidationError {
    fn from(record: ViolationRecord) -> Self {
        Self::Violation(record)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Violation(record) => record.fmt(f),
            Self::Unclassified(message) => f.write_str(message),
        }
    }
}

/// Non-empty, ordered set of errors that survived compliance filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompoundError {
    errors: Vec<ValidationError>,
}

impl CompoundError {
    /// Wrap retained errors; an empty set yields `None`.
    pub fn from_errors(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for CompoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.errors.len() == 1 { "error" } else { "errors" };
        writeln!(f, "{} {} occurred:", self.errors.len(), noun)?;
        for error in &self.errors {
            writeln!(f, "\t* {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompoundError {}
