use crate::spec::spec_model::{AssertionResult, HealedReference};

/// Mutable state of one scenario while the runner walks its steps.
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    /// Index of the step being executed (0-based)
    pub current_step: usize,

    /// Assertion outcomes gathered so far, in step order
    pub assertion_results: Vec<AssertionResult>,

    /// Element references that only resolved through self-healing
    pub healed: Vec<HealedReference>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the outcomes of one `assert` step.
    pub fn record_assertions(&mut self, results: Vec<AssertionResult>) {
        self.assertion_results.extend(results);
    }

    /// Note that `requested` was served by `healed_to` at the current step.
    pub fn record_healed(&mut self, requested: &str, healed_to: &str) {
        self.healed.push(HealedReference {
            step_index: self.current_step,
            requested: requested.to_string(),
            healed_to: healed_to.to_string(),
        });
    }

    /// True when no assertion has failed. Vacuously true before any ran.
    pub fn all_passed(&self) -> bool {
        self.assertion_results.iter().all(|r| r.passed)
    }

    /// Number of assertions that held.
    pub fn pass_count(&self) -> usize {
        self.assertion_results.iter().filter(|r| r.passed).count()
    }

    /// Number of assertions that did not hold.
    pub fn fail_count(&self) -> usize {
        self.assertion_results.iter().filter(|r| !r.passed).count()
    }
}
