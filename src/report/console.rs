use crate::report::report_model::TestSuiteReport;
use crate::spec::spec_model::AssertionSpec;

// ============================================================================
// Console reporter
// ============================================================================

/// Format a suite report for the terminal.
///
/// ```text
/// === Test Suite: checkout ===
///
/// ✓ PASS  Login (3 steps, 1 assertions)
///     [HEALED] Step 2: saucedemo_login_submit_login_button -> saucedemo_login_login_login_button
/// ✗ FAIL  Checkout (5 steps, 2 assertions)
///     [FAIL] Step 4: ElementVisible — Element 'x' is not visible
///
/// === Results: 1 passed, 1 failed (2 total), 1 healed ===
/// ```
pub fn format_console_report(report: &TestSuiteReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Test Suite: {} ===\n\n", report.suite_name));

    for result in &report.test_results {
        let marker = if result.passed { "\u{2713} PASS" } else { "\u{2717} FAIL" };

        out.push_str(&format!(
            "{}  {} ({} steps, {} assertions)\n",
            marker,
            result.spec_name,
            result.steps_run,
            result.assertion_results.len()
        ));

        for healed in &result.healed {
            out.push_str(&format!(
                "    [HEALED] Step {}: {} -> {}\n",
                healed.step_index, healed.requested, healed.healed_to
            ));
        }

        if let Some(ref error) = result.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        }

        for ar in result.assertion_results.iter().filter(|a| !a.passed) {
            out.push_str(&format!(
                "    [FAIL] Step {}: {} \u{2014} {}\n",
                ar.step_index,
                assertion_name(&ar.spec),
                ar.message.as_deref().unwrap_or("assertion failed")
            ));
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total)",
        report.passed, report.failed, report.total
    ));
    if report.healed_references > 0 {
        out.push_str(&format!(", {} healed", report.healed_references));
    }
    if let Some(ms) = report.duration_ms {
        out.push_str(&format!(" in {:.1}s", ms as f64 / 1000.0));
    }
    out.push_str(" ===\n");

    out
}

fn assertion_name(spec: &AssertionSpec) -> &'static str {
    match spec {
        AssertionSpec::UrlContains { .. } => "UrlContains",
        AssertionSpec::UrlEquals { .. } => "UrlEquals",
        AssertionSpec::ElementVisible { .. } => "ElementVisible",
    }
}
