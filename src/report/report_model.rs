use serde::{Deserialize, Serialize};

use crate::spec::spec_model::TestResult;

/// Aggregated outcome of running several scenarios.
///
/// Built with `from_results()` and rendered by the console reporter or
/// written out as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteReport {
    /// Label shown in the report header
    pub suite_name: String,

    /// Scenarios run
    pub total: usize,

    /// Scenarios that finished with every assertion holding
    pub passed: usize,

    /// Scenarios that errored or had a failing assertion
    pub failed: usize,

    /// Element references across all scenarios that only resolved by
    /// self-healing. Non-zero means stored records have drifted from the app.
    pub healed_references: usize,

    /// Wall-clock time for the whole run, when measured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    /// Per-scenario outcomes in run order
    pub test_results: Vec<TestResult>,
}

impl TestSuiteReport {
    /// Summarize `results`, counting passes, failures and healed references.
    pub fn from_results(suite_name: &str, results: Vec<TestResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let healed_references = results.iter().map(|r| r.healed.len()).sum();
        Self {
            suite_name: suite_name.to_string(),
            total,
            passed,
            failed: total - passed,
            healed_references,
            duration_ms: None,
            test_results: results,
        }
    }

    /// Attach the measured run time.
    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// True when no scenario failed.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
