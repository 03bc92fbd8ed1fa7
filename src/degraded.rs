use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::extract::code_only;
use crate::template::Scaffold;

lazy_static! {
    static ref RESOURCE_TYPE: Regex = Regex::new(
        r"\b(BufferedReader|FileReader|InputStreamReader|Scanner|FileInputStream|BufferedWriter|FileWriter|PrintWriter)\b"
    )
    .unwrap();
    static ref TRY_WITH_RESOURCES: Regex = Regex::new(
        r"\btry\s*\(\s*(?:final\s+)?(?:var|BufferedReader|FileReader|InputStreamReader|Scanner|FileInputStream|BufferedWriter|FileWriter|PrintWriter)\b"
    )
    .unwrap();
    static ref CASE_NORMALIZATION: Regex =
        Regex::new(r"\.(?:toLowerCase|toUpperCase)\s*\(|\bequalsIgnoreCase\s*\(").unwrap();
    static ref RETURN_STATEMENT: Regex = Regex::new(r"\breturn\b").unwrap();
}

/// Non-whitespace characters below which a fragment is considered trivial
const MIN_SIGNIFICANT_CHARS: usize = 20;

const UNAVAILABLE_NOTICE: &str =
    "Code execution is unavailable right now; your answer was saved for manual review.";

/// Static review produced when the execution service cannot be used
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DegradedReview {
    pub heuristic_findings: Vec<String>,
    pub treated_as_success: bool,
}

struct Check {
    passes: fn(&str) -> bool,
    passed: &'static str,
    failed: &'static str,
}

const CHECKS: &[Check] = &[
    Check {
        passes: |code| CASE_NORMALIZATION.is_match(code),
        passed: "Text is case-normalized before comparison.",
        failed: "No case normalization found; comparisons may be case-sensitive.",
    },
    Check {
        passes: |code| RETURN_STATEMENT.is_match(code),
        passed: "A return statement is present.",
        failed: "No return statement found.",
    },
    Check {
        passes: braces_balanced,
        passed: "Braces are balanced.",
        failed: "Braces are not balanced.",
    },
    Check {
        passes: |code| code.chars().filter(|c| !c.is_whitespace()).count() >= MIN_SIGNIFICANT_CHARS,
        passed: "The answer has substantive content.",
        failed: "The answer looks too short to be complete.",
    },
];

/// Reviews `fragment` with textual checks instead of running it.
///
/// The learner is never blocked by an outage: the review always counts as
/// a success and correctness is left to a human reviewer.
pub fn review_heuristically(fragment: &str) -> DegradedReview {
    review(fragment, None)
}

/// Same review, with the resource check narrowed to the reader or stream
/// type the scaffold's method signature takes.
pub fn review_for_scaffold(fragment: &str, scaffold: &Scaffold) -> DegradedReview {
    let resource = scaffold
        .signature()
        .and_then(|signature| RESOURCE_TYPE.find(signature))
        .map(|m| m.as_str());
    review(fragment, resource)
}

fn review(fragment: &str, resource: Option<&str>) -> DegradedReview {
    let code = code_only(fragment);

    let mut heuristic_findings = Vec::with_capacity(CHECKS.len() + 2);
    heuristic_findings.push(UNAVAILABLE_NOTICE.to_string());
    heuristic_findings.push(resource_finding(&code, resource));

    for check in CHECKS {
        let finding = if (check.passes)(&code) {
            check.passed
        } else {
            check.failed
        };
        heuristic_findings.push(finding.to_string());
    }

    DegradedReview {
        heuristic_findings,
        treated_as_success: true,
    }
}

fn resource_finding(code: &str, resource: Option<&str>) -> String {
    match resource {
        Some(resource) if scopes_resource(code, resource) => {
            format!("The {resource} is opened in a try-with-resources block.")
        }
        Some(resource) => {
            format!("No try-with-resources block opens a {resource}; it may not be closed.")
        }
        None if scopes_resources(code) => {
            "Readers and streams are opened in a try-with-resources block.".to_string()
        }
        None => {
            "A reader or stream is used without try-with-resources; it may not be closed."
                .to_string()
        }
    }
}

/// Passes when no resource type is used, or when one is scoped by `try (...)`
fn scopes_resources(code: &str) -> bool {
    !RESOURCE_TYPE.is_match(code) || TRY_WITH_RESOURCES.is_match(code)
}

/// Passes when a `try (...)` opens `resource` (or a `var` of it)
fn scopes_resource(code: &str, resource: &str) -> bool {
    Regex::new(&format!(
        r"\btry\s*\(\s*(?:final\s+)?(?:var|{})\b",
        regex::escape(resource)
    ))
    .is_ok_and(|re| re.is_match(code))
}

/// Expects literals and comments already blanked by [`code_only`]
fn braces_balanced(code: &str) -> bool {
    let mut depth = 0i64;
    for c in code.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
