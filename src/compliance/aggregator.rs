//! Run the rule engine once and fold everything it reports through the
//! compliance filter.

use super::filter::{filter, FilterOutcome};
use super::level::NormativeLevel;
use super::rules::RuleEngine;
use crate::config::types::Result;

/// Aggregates a rule engine's output into a single compound result.
pub struct ValidationAggregator<'a> {
    engine: &'a dyn RuleEngine,
    threshold: NormativeLevel,
}

impl<'a> ValidationAggregator<'a> {
    pub fn new(engine: &'a dyn RuleEngine, threshold: NormativeLevel) -> Self {
        Self { engine, threshold }
    }

    pub fn threshold(&self) -> NormativeLevel {
        self.threshold
    }

    /// Run all checks. Engine failures propagate unchanged; violations never
    /// do, they end up in the returned outcome.
    pub fn run(&self) -> Result<FilterOutcome> {
        let raw = self.engine.run_all_checks()?;
        let total = raw.len();
        let outcome = filter(raw, self.threshold);

        log::debug!(
            "validation at {}: {} raw, {} retained, {} suppressed",
            self.threshold,
            total,
            outcome.error.as_ref().map_or(0, |e| e.len()),
            outcome.suppressed.len()
        );
        Ok(outcome)
    }
}
