use serde::Serialize;

use crate::error::{GradingError, GradingResult};
use crate::execution::{ExecutionClient, ExecutionOutcome, StatusClass};
use crate::template::{ComposedProgram, TestCase};

/// Outcome of one test case
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TestResult {
    /// Position of the case within the question
    pub index: usize,
    pub test_case: TestCase,
    pub actual_output: String,
    pub passed: bool,
    /// Missing when the run itself failed
    pub outcome: Option<ExecutionOutcome>,
    pub error: Option<String>,
}

impl TestResult {
    fn from_outcome(index: usize, test_case: &TestCase, outcome: ExecutionOutcome) -> Self {
        let passed = outcome.is_accepted()
            && normalize_output(&outcome.stdout) == normalize_output(&test_case.expected_output);

        Self {
            index,
            test_case: test_case.clone(),
            actual_output: outcome.stdout.clone(),
            passed,
            outcome: Some(outcome),
            error: None,
        }
    }

    fn from_error(index: usize, test_case: &TestCase, error: &GradingError) -> Self {
        Self {
            index,
            test_case: test_case.clone(),
            actual_output: String::new(),
            passed: false,
            outcome: None,
            error: Some(error.to_string()),
        }
    }

    fn feedback_line(&self) -> String {
        let label = if self.test_case.description.is_empty() {
            format!("Test {}", self.index + 1)
        } else {
            format!("Test {} ({})", self.index + 1, self.test_case.description)
        };

        match (&self.outcome, &self.error) {
            (_, Some(error)) => format!("{label}: could not be run: {error}"),
            (Some(outcome), None) if outcome.is_accepted() => format!(
                "{label}: expected {:?}, got {:?}",
                normalize_output(&self.test_case.expected_output),
                normalize_output(&self.actual_output)
            ),
            (Some(outcome), None) => format!("{label}: {}", describe_failure(outcome)),
            (None, None) => format!("{label}: no result"),
        }
    }
}

/// Aggregated score of a submission
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub passed_count: usize,
    pub total_count: usize,
    /// 0 to 100
    pub percentage: u8,
    pub per_test_results: Vec<TestResult>,
    pub feedback: String,
}

impl ScoreReport {
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let total_count = results.len();
        let passed_count = results.iter().filter(|r| r.passed).count();
        let percentage = percentage(passed_count, total_count);

        let mut feedback = if passed_count == total_count {
            format!("All {total_count} test cases passed.")
        } else {
            format!("{passed_count} of {total_count} test cases passed ({percentage}%).")
        };
        for result in results.iter().filter(|r| !r.passed) {
            feedback.push('\n');
            feedback.push_str(&result.feedback_line());
        }

        Self {
            passed_count,
            total_count,
            percentage,
            per_test_results: results,
            feedback,
        }
    }

    /// Score of a question without test cases: pass or fail on the status alone
    pub fn from_single_run(outcome: &ExecutionOutcome) -> Self {
        let (percentage, feedback) = if outcome.is_accepted() {
            (100, "Program ran successfully.".to_string())
        } else {
            (0, describe_failure(outcome))
        };

        Self {
            passed_count: 0,
            total_count: 0,
            percentage,
            per_test_results: Vec::new(),
            feedback,
        }
    }

    /// Zero score for a submission that could not be graded
    pub fn from_error(error: &GradingError) -> Self {
        Self {
            passed_count: 0,
            total_count: 0,
            percentage: 0,
            per_test_results: Vec::new(),
            feedback: format!("Your submission could not be graded: {error}"),
        }
    }
}

fn percentage(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (100.0 * passed as f64 / total as f64).round() as u8
}

fn describe_failure(outcome: &ExecutionOutcome) -> String {
    let detail = match outcome.status_class {
        StatusClass::CompileError => first_line(&outcome.compile_output),
        StatusClass::RuntimeError | StatusClass::InternalError => first_line(&outcome.stderr),
        _ => "",
    };

    if detail.is_empty() {
        outcome.status_class.to_string()
    } else {
        format!("{}: {detail}", outcome.status_class)
    }
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

/// Output comparison form: `\n` line endings, whitespace runs within a line
/// collapsed to one space, lines trimmed, surrounding blank lines dropped.
pub fn normalize_output(output: &str) -> String {
    output
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Runs `program` once per test case, strictly in order, and scores it.
///
/// A failure of one case is recorded against that case and the remaining
/// cases still run. The only error returned is a configuration or transport
/// failure on the first contact with the service, meaning it is unusable.
pub async fn validate(
    client: &ExecutionClient,
    program: &ComposedProgram,
    test_cases: &[TestCase],
) -> GradingResult<ScoreReport> {
    if test_cases.is_empty() {
        return match client.execute(program, "").await {
            Ok(outcome) => Ok(ScoreReport::from_single_run(&outcome)),
            Err(e) if e.is_degradable() => Err(e),
            Err(e) => {
                log::warn!("Single run failed: {e}");
                Ok(ScoreReport::from_error(&e))
            }
        };
    }

    let mut results = Vec::with_capacity(test_cases.len());
    let mut service_reached = false;

    for (index, test_case) in test_cases.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(client.test_case_delay()).await;
        }

        match client.execute(program, &test_case.input).await {
            Ok(outcome) => {
                service_reached = true;
                let result = TestResult::from_outcome(index, test_case, outcome);
                log::debug!(
                    "Test case {} finished: {}",
                    index + 1,
                    if result.passed { "passed" } else { "failed" }
                );
                results.push(result);
            }
            Err(e) if e.is_degradable() && !service_reached => return Err(e),
            Err(e) => {
                service_reached = service_reached || !e.is_degradable();
                log::warn!("Test case {} failed to run: {e}", index + 1);
                results.push(TestResult::from_error(index, test_case, &e));
            }
        }
    }

    Ok(ScoreReport::from_results(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn case(expected: &str) -> TestCase {
        TestCase {
            input: String::new(),
            expected_output: expected.to_string(),
            description: String::new(),
        }
    }

    fn outcome(status_class: StatusClass, stdout: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            terminal: true,
            status_class,
            status_description: status_class.to_string(),
            stdout: stdout.to_string(),
            stderr: String::new(),
            compile_output: String::new(),
            time_ms: None,
            memory_kb: None,
            exit_code: None,
        }
    }

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("  3 \r\n"), "3");
        assert_eq!(normalize_output("a\t b\r\nc   d\n\n"), "a b\nc d");
        assert_eq!(normalize_output("\n\n x \n"), "x");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["", " a  b \r\n\r\n c\t\n", "\r\r x", "one\ntwo  three\n\n\nfour "] {
            let once = normalize_output(raw);
            assert_eq!(normalize_output(&once), once);
        }
    }

    #[test]
    fn test_accepted_output_must_match() {
        let passing = TestResult::from_outcome(0, &case("3"), outcome(StatusClass::Accepted, "3\n"));
        assert!(passing.passed);

        let failing = TestResult::from_outcome(1, &case("3"), outcome(StatusClass::Accepted, "4\n"));
        assert!(!failing.passed);
        assert_eq!(failing.feedback_line(), "Test 2: expected \"3\", got \"4\"");
    }

    #[test]
    fn test_non_accepted_fails_regardless_of_output() {
        let mut compile_error = outcome(StatusClass::CompileError, "3");
        compile_error.compile_output = "Main.java:4: error: missing return statement\n".to_string();

        let result = TestResult::from_outcome(0, &case("3"), compile_error);
        assert!(!result.passed);
        assert_eq!(
            result.feedback_line(),
            "Test 1: Compilation Error: Main.java:4: error: missing return statement"
        );
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0, 3), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_report_feedback_lists_failures() {
        let results = vec![
            TestResult::from_outcome(0, &case("1"), outcome(StatusClass::Accepted, "1")),
            TestResult::from_error(
                1,
                &TestCase {
                    description: "Empty input".to_string(),
                    ..case("0")
                },
                &GradingError::ExecutionTimeout { attempts: 10 },
            ),
        ];

        let report = ScoreReport::from_results(results);
        assert_eq!(report.passed_count, 1);
        assert_eq!(report.total_count, 2);
        assert_eq!(report.percentage, 50);
        assert_eq!(
            report.feedback,
            "1 of 2 test cases passed (50%).\nTest 2 (Empty input): could not be run: execution timed out after 10 polling attempts"
        );
    }

    #[test]
    fn test_single_run_is_binary() {
        assert_eq!(
            ScoreReport::from_single_run(&outcome(StatusClass::Accepted, "")).percentage,
            100
        );
        let report = ScoreReport::from_single_run(&outcome(StatusClass::TimeLimit, ""));
        assert_eq!(report.percentage, 0);
        assert_eq!(report.feedback, "Time Limit Exceeded");
    }
}
