use serde::{Deserialize, Serialize};

/// A scenario whose steps refer to elements by their stored unique name.
/// Usually generated from the element store and kept as YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestSpec {
    pub name: String,

    /// Opened before the first step
    pub start_url: String,

    pub steps: Vec<TestStep>,
}

/// One scenario step, tagged by `action`. Element fields hold unique names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    Fill { element: String, value: String },

    Click { element: String },

    Navigate { url: String },

    /// Fixed pause, milliseconds
    Wait { duration_ms: u64 },

    Assert { assertions: Vec<AssertionSpec> },
}

/// Check made by an `assert` step, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssertionSpec {
    UrlContains { expected: String },

    UrlEquals { expected: String },

    /// The element resolves (healing allowed) and is visible
    ElementVisible { element: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssertionResult {
    /// 0-based index of the `assert` step
    pub step_index: usize,
    pub spec: AssertionSpec,
    pub passed: bool,

    /// Observed URL or visibility
    pub actual: Option<String>,
    pub message: Option<String>,
}

/// An element reference that only resolved through self-healing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealedReference {
    pub step_index: usize,
    pub requested: String,
    pub healed_to: String,
}

/// Outcome of one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub spec_name: String,
    pub passed: bool,

    /// Steps started, including the one that errored
    pub steps_run: usize,

    pub assertion_results: Vec<AssertionResult>,

    #[serde(default)]
    pub healed: Vec<HealedReference>,

    /// Set when a step could not run (unresolvable element, dead session).
    /// Failed assertions alone leave it empty.
    pub error: Option<String>,
}

impl TestResult {
    /// A scenario stopped by an error after `steps_run` steps.
    pub fn aborted(
        spec_name: &str,
        steps_run: usize,
        assertion_results: Vec<AssertionResult>,
        healed: Vec<HealedReference>,
        error: String,
    ) -> Self {
        TestResult {
            spec_name: spec_name.to_string(),
            passed: false,
            steps_run,
            assertion_results,
            healed,
            error: Some(error),
        }
    }
}
