use crate::constants::REDACTED;
use crate::core::domain::TestCaseResult;

/// Copy of `results` safe to show a non-privileged caller: hidden cases keep
/// their verdict and error but lose input, expected and actual output.
pub fn redact(results: &[TestCaseResult]) -> Vec<TestCaseResult> {
    results.iter().map(redact_one).collect()
}

fn redact_one(result: &TestCaseResult) -> TestCaseResult {
    if !result.is_hidden {
        return result.clone();
    }

    TestCaseResult {
        input: REDACTED.to_string(),
        expected_output: REDACTED.to_string(),
        actual_output: REDACTED.to_string(),
        ..result.clone()
    }
}
