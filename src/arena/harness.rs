//! Assertion harness: weighted pass/fail test suites over agent output.
//!
//! A suite result depends only on the output string and the suite itself;
//! wall-clock only shows up in the `run_at`/`duration_ms` bookkeeping fields.

use crate::core::time::now_rfc3339;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One assertion against agent output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestCase {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// "contains", "not_contains", "regex", or "equals".
    #[serde(rename = "type")]
    pub kind: String,
    pub expected: String,
    /// Missing or non-positive weights count as 1.0.
    #[serde(default)]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Groups related test cases for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestSuite {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Outcome of running one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestResult {
    pub test_case_id: String,
    pub test_name: String,
    pub passed: bool,
    /// weight when passed, 0 otherwise.
    pub score: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

/// Aggregate outcome of a suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SuiteResult {
    pub suite_id: String,
    pub suite_name: String,
    pub results: Vec<TestResult>,
    pub total_score: f64,
    pub max_score: f64,
    pub pass_rate: f64,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub run_at: String,
}

impl SuiteResult {
    /// Maps the suite score onto the 1-10 scale: `1 + 9·(total/max)`,
    /// truncated toward zero and clamped. An empty or zero-weight suite
    /// scores 1.
    pub fn normalized_score(&self) -> i64 {
        if self.max_score <= 0.0 {
            return 1;
        }
        let ratio = self.total_score / self.max_score;
        let score = (ratio * 9.0) as i64 + 1;
        score.clamp(1, 10)
    }
}

/// Executes all test cases in a suite against the given output.
pub fn run_suite(suite: &TestSuite, output: &str) -> SuiteResult {
    let start = Instant::now();
    let mut results = Vec::with_capacity(suite.test_cases.len());

    let mut total_score = 0.0;
    let mut max_score = 0.0;
    let mut passed = 0usize;
    let mut failed = 0usize;

    for tc in &suite.test_cases {
        let result = run_test_case(tc, output);
        total_score += result.score;
        max_score += effective_weight(tc);
        if result.passed {
            passed += 1;
        } else {
            failed += 1;
        }
        results.push(result);
    }

    let pass_rate = if suite.test_cases.is_empty() {
        0.0
    } else {
        passed as f64 / suite.test_cases.len() as f64
    };

    SuiteResult {
        suite_id: suite.id.clone(),
        suite_name: suite.name.clone(),
        results,
        total_score,
        max_score,
        pass_rate,
        passed,
        failed,
        duration_ms: start.elapsed().as_millis() as u64,
        run_at: now_rfc3339(),
    }
}

fn effective_weight(tc: &TestCase) -> f64 {
    if tc.weight <= 0.0 {
        1.0
    } else {
        tc.weight
    }
}

fn run_test_case(tc: &TestCase, output: &str) -> TestResult {
    let weight = effective_weight(tc);
    let (passed, detail) = evaluate(&tc.kind, &tc.expected, output);

    TestResult {
        test_case_id: tc.id.clone(),
        test_name: tc.name.clone(),
        passed,
        score: if passed { weight } else { 0.0 },
        detail,
    }
}

fn evaluate(kind: &str, expected: &str, output: &str) -> (bool, String) {
    match kind.trim().to_lowercase().as_str() {
        "contains" => {
            if output.contains(expected) {
                (true, format!("output contains {:?}", expected))
            } else {
                (false, format!("output does not contain {:?}", expected))
            }
        }
        "not_contains" => {
            if !output.contains(expected) {
                (
                    true,
                    format!("output does not contain {:?} (as expected)", expected),
                )
            } else {
                (false, format!("output contains {:?} (unexpected)", expected))
            }
        }
        "regex" => match Regex::new(expected) {
            Ok(re) => {
                if re.is_match(output) {
                    (true, format!("output matches regex {:?}", expected))
                } else {
                    (false, format!("output does not match regex {:?}", expected))
                }
            }
            Err(err) => (false, format!("invalid regex {:?}: {}", expected, err)),
        },
        "equals" => {
            if output.trim() == expected.trim() {
                (true, "output equals expected".to_string())
            } else {
                (false, "output does not equal expected".to_string())
            }
        }
        other => (false, format!("unknown test type {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(kind: &str, expected: &str, weight: f64) -> TestCase {
        TestCase {
            id: format!("tc_{}", expected.len()),
            name: format!("{} {}", kind, expected),
            kind: kind.into(),
            expected: expected.into(),
            weight,
            description: String::new(),
        }
    }

    fn suite(cases: Vec<TestCase>) -> TestSuite {
        TestSuite {
            id: "ts_00000001".into(),
            name: "suite".into(),
            test_cases: cases,
        }
    }

    #[test]
    fn test_all_passing_suite_scores_ten() {
        let suite = suite(vec![
            case("contains", "hello", 1.0),
            case("contains", "world", 1.0),
        ]);
        let result = run_suite(&suite, "hello world");
        assert_eq!(result.passed, 2);
        assert_eq!(result.failed, 0);
        assert_eq!(result.total_score, 2.0);
        assert_eq!(result.normalized_score(), 10);
    }

    #[test]
    fn test_half_passing_suite_truncates_to_five() {
        let suite = suite(vec![
            case("contains", "hello", 1.0),
            case("contains", "world", 1.0),
        ]);
        let result = run_suite(&suite, "hello there");
        assert_eq!(result.passed, 1);
        assert_eq!(result.total_score, 1.0);
        // 1 + 9*0.5 = 5.5, truncated to 5.
        assert_eq!(result.normalized_score(), 5);
    }

    #[test]
    fn test_empty_suite_bounds() {
        let result = run_suite(&suite(vec![]), "anything");
        assert_eq!(result.pass_rate, 0.0);
        assert_eq!(result.max_score, 0.0);
        assert_eq!(result.normalized_score(), 1);
    }

    #[test]
    fn test_not_contains_passes_on_absence() {
        let suite = suite(vec![case("not_contains", "error", 1.0)]);
        assert!(run_suite(&suite, "all good").results[0].passed);
        assert!(!run_suite(&suite, "error: boom").results[0].passed);
    }

    #[test]
    fn test_regex_matching_and_compile_failure() {
        let ok = run_suite(&suite(vec![case("regex", r"v\d+", 1.0)]), "release v42");
        assert!(ok.results[0].passed);

        let bad = run_suite(&suite(vec![case("regex", r"([", 1.0)]), "anything");
        assert!(!bad.results[0].passed);
        assert!(bad.results[0].detail.contains("invalid regex"));
    }

    #[test]
    fn test_equals_trims_both_sides() {
        let suite = suite(vec![case("equals", "  done  ", 1.0)]);
        assert!(run_suite(&suite, "done\n").results[0].passed);
        assert!(!run_suite(&suite, "done!").results[0].passed);
    }

    #[test]
    fn test_unknown_type_fails_with_diagnostic() {
        let result = run_suite(&suite(vec![case("fuzzy", "x", 1.0)]), "x");
        assert!(!result.results[0].passed);
        assert!(result.results[0].detail.contains("unknown test type"));
    }

    #[test]
    fn test_non_positive_weight_counts_as_one() {
        let suite = suite(vec![case("contains", "a", 0.0), case("contains", "b", -2.0)]);
        let result = run_suite(&suite, "a b");
        assert_eq!(result.total_score, 2.0);
        assert_eq!(result.max_score, 2.0);
    }

    #[test]
    fn test_weighted_partial_score() {
        let suite = suite(vec![
            case("contains", "alpha", 3.0),
            case("contains", "beta", 1.0),
        ]);
        let result = run_suite(&suite, "alpha only");
        assert_eq!(result.total_score, 3.0);
        assert_eq!(result.max_score, 4.0);
        // 1 + 9*0.75 = 7.75, truncated to 7.
        assert_eq!(result.normalized_score(), 7);
    }
}
