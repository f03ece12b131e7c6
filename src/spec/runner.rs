use tracing::{debug, info};

use crate::browser::page::LivePage;
use crate::error::{ResolveError, StepError};
use crate::resolver::engine::LocatorResolver;
use crate::resolver::strategy::ActionKind;
use crate::spec::context::TestContext;
use crate::spec::spec_model::{AssertionResult, AssertionSpec, TestResult, TestSpec, TestStep};

/// Executes a TestSpec step-by-step, resolving every element reference
/// through the locator resolver.
pub struct TestRunner;

impl TestRunner {
    /// Run a complete test spec against a live page.
    ///
    /// Returns a TestResult with pass/fail status, assertion results,
    /// healed references and any error that stopped execution.
    pub fn run<P: LivePage + ?Sized>(spec: &TestSpec, page: &mut P, resolver: &LocatorResolver<'_>) -> TestResult {
        let mut ctx = TestContext::new();
        info!(spec = %spec.name, steps = spec.steps.len(), "running test spec");

        if let Err(e) = page.navigate(&spec.start_url) {
            return TestResult::aborted(
                &spec.name,
                0,
                ctx.assertion_results,
                ctx.healed,
                format!("Failed to navigate to start_url: {}", e),
            );
        }

        for (i, step) in spec.steps.iter().enumerate() {
            ctx.current_step = i;
            debug!(step = i, ?step, "executing step");

            if let Err(e) = Self::execute_step(step, i, page, resolver, &mut ctx) {
                return TestResult::aborted(
                    &spec.name,
                    i + 1,
                    ctx.assertion_results,
                    ctx.healed,
                    format!("Step {} failed: {}", i, e),
                );
            }
        }

        let passed = ctx.all_passed();
        TestResult {
            spec_name: spec.name.clone(),
            passed,
            steps_run: spec.steps.len(),
            assertion_results: ctx.assertion_results,
            healed: ctx.healed,
            error: None,
        }
    }

    fn execute_step<P: LivePage + ?Sized>(
        step: &TestStep,
        step_index: usize,
        page: &mut P,
        resolver: &LocatorResolver<'_>,
        ctx: &mut TestContext,
    ) -> Result<(), StepError> {
        match step {
            TestStep::Fill { element, value } => {
                let mut handle = resolver.resolve(element, page, ActionKind::Fill)?;
                if let Some(healed) = &handle.healed_to {
                    ctx.record_healed(element, healed);
                }
                handle.fill(value)?;
                Ok(())
            }

            TestStep::Click { element } => {
                let mut handle = resolver.resolve(element, page, ActionKind::Click)?;
                if let Some(healed) = &handle.healed_to {
                    ctx.record_healed(element, healed);
                }
                handle.click()?;
                Ok(())
            }

            TestStep::Navigate { url } => Ok(page.navigate(url)?),

            TestStep::Wait { duration_ms } => Ok(page.wait(*duration_ms)?),

            TestStep::Assert { assertions } => {
                for spec in assertions {
                    let result = Self::evaluate_one(spec, step_index, page, resolver, ctx)?;
                    ctx.record_assertions(vec![result]);
                }
                Ok(())
            }
        }
    }

    /// Evaluate a single assertion. A broken session aborts the test; an
    /// element that cannot be found fails the assertion.
    fn evaluate_one<P: LivePage + ?Sized>(
        spec: &AssertionSpec,
        step_index: usize,
        page: &mut P,
        resolver: &LocatorResolver<'_>,
        ctx: &mut TestContext,
    ) -> Result<AssertionResult, StepError> {
        let result = |passed: bool, actual: Option<String>, message: Option<String>| AssertionResult {
            step_index,
            spec: spec.clone(),
            passed,
            actual,
            message,
        };

        match spec {
            AssertionSpec::UrlContains { expected } => {
                let url = page.current_url()?;
                let passed = url.contains(expected.as_str());
                let message = (!passed).then(|| format!("URL does not contain '{}'", expected));
                Ok(result(passed, Some(url), message))
            }

            AssertionSpec::UrlEquals { expected } => {
                let url = page.current_url()?;
                let passed = url == *expected;
                let message = (!passed).then(|| format!("URL does not equal '{}'", expected));
                Ok(result(passed, Some(url), message))
            }

            AssertionSpec::ElementVisible { element } => match resolver.resolve(element, page, ActionKind::Assert) {
                Ok(mut handle) => {
                    if let Some(healed) = &handle.healed_to {
                        ctx.record_healed(element, healed);
                    }
                    let visible = handle.is_visible()?;
                    let message = (!visible).then(|| format!("Element '{}' is not visible", element));
                    Ok(result(visible, Some(format!("{}", visible)), message))
                }
                Err(ResolveError::NotFound(e)) => Ok(result(false, None, Some(e.to_string()))),
                Err(e) => Err(e.into()),
            },
        }
    }
}
