//! Assertion evaluation for one action outcome.
//!
//! [`evaluate`] judges a single [`Outcome`] against an optional
//! [`Expect`] and produces a fresh [`Assertions`] value: the ordered
//! failures for this attempt plus a terminal flag saying whether the
//! poll controller should stop retrying. Checks run in a fixed order:
//! error classification, list length, structural match, delegated
//! payload assertion.
//!
//! Error classification is the subtle part. Errors the author declared
//! they expect (an unknown kind, a not-found status, a message
//! substring) are *swallowed* and evaluation continues; anything left
//! over afterwards is unexpected and terminal. The precedence lives in
//! [`classify_error`] as one explicit pass so it can be audited and
//! tested in isolation.

use crate::compare::{compare, match_object_from_source};
use crate::errors::{EvalError, StoreError, NOT_FOUND};
use crate::payload::PayloadAssertions;
use crate::spec::Expect;
use crate::store::{Outcome, Subject};

/// The result of evaluating one attempt. Never reused across attempts.
#[derive(Debug, Default)]
pub struct Assertions {
    failures: Vec<EvalError>,
    terminal: bool,
}

impl Assertions {
    /// Whether every assertion passed.
    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether a failure was non-retryable. Monotonic within an attempt.
    pub fn terminal(&self) -> bool {
        self.terminal
    }

    pub fn failures(&self) -> &[EvalError] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<EvalError> {
        self.failures
    }

    fn fail(&mut self, failure: EvalError) {
        self.failures.push(failure);
    }

    fn fail_terminal(&mut self, failure: EvalError) {
        self.failures.push(failure);
        self.terminal = true;
    }
}

/// Evaluate one action outcome against the declared expectations.
///
/// With no expectation attached the only contract is "the action did not
/// error": any error is a terminal failure and a clean outcome passes.
pub fn evaluate(
    exp: Option<&Expect>,
    outcome: Outcome,
    engine: &dyn PayloadAssertions,
) -> Assertions {
    let Outcome { err, subject } = outcome;
    let mut a = Assertions::default();

    let Some(exp) = exp else {
        if let Some(e) = err {
            a.fail_terminal(EvalError::Unexpected(e.to_string()));
        }
        return a;
    };

    match classify_error(exp, err, subject.is_some()) {
        ErrorVerdict::Resolved => {}
        ErrorVerdict::Retryable(failure) => {
            a.fail(failure);
            return a;
        }
        ErrorVerdict::Terminal(failure) => {
            a.fail_terminal(failure);
            return a;
        }
    }

    if let (Some(want), Some(Subject::Many(items))) = (exp.len, subject.as_ref()) {
        if items.len() != want {
            a.fail(EvalError::NotEqualLength {
                want,
                got: items.len(),
            });
            return a;
        }
    }

    if let (Some(source), Some(Subject::One(res))) = (exp.matches.as_ref(), subject.as_ref()) {
        let expected = match match_object_from_source(source) {
            Ok(expected) => expected,
            Err(e) => {
                a.fail_terminal(EvalError::MatchesInvalid(e.to_string()));
                return a;
            }
        };
        let delta = compare(&expected, res.value());
        if !delta.is_empty() {
            for diff in delta.into_differences() {
                a.fail(EvalError::MatchesNotEqual(diff));
            }
            return a;
        }
    }

    if let (Some(descriptor), Some(subject)) = (exp.payload.as_ref(), subject.as_ref()) {
        let serialized = match subject {
            Subject::One(res) => serde_json::to_vec(res.value()),
            Subject::Many(items) => {
                serde_json::to_vec(&items.iter().map(|r| r.value()).collect::<Vec<_>>())
            }
        };
        // A subject that cannot be serialized is an internal invariant
        // violation, not a test failure.
        let bytes = serialized
            .unwrap_or_else(|e| panic!("unable to serialize subject for payload assertion: {e}"));
        let result = engine.evaluate(descriptor, &bytes);
        if !result.pass {
            a.terminal |= result.terminal;
            for failure in result.failures {
                a.fail(EvalError::Payload(failure));
            }
        }
    }

    a
}

/// What the error-classification pass decided.
enum ErrorVerdict {
    /// No error, or every error was expected and swallowed. Continue with
    /// the remaining checks.
    Resolved,
    /// A mismatch that eventual consistency may still fix.
    Retryable(EvalError),
    /// A failure that must not be retried.
    Terminal(EvalError),
}

/// Classify the action error against the expectation, swallowing expected
/// errors in precedence order: unknown kind first, then structured status
/// codes, then the declared message substring. Whatever survives is
/// unexpected.
fn classify_error(exp: &Expect, err: Option<StoreError>, has_subject: bool) -> ErrorVerdict {
    let err = match err {
        Some(e @ StoreError::KindUnknown(_)) => {
            if !exp.unknown {
                return ErrorVerdict::Terminal(EvalError::Unexpected(e.to_string()));
            }
            None
        }
        other => other,
    };

    let err = match err {
        Some(StoreError::Status { code, .. }) => {
            if !exp.expects_not_found() && code != NOT_FOUND {
                return ErrorVerdict::Retryable(EvalError::ExpectedNotFound(format!(
                    "got status code {code}"
                )));
            }
            // A not-found code is swallowed even when absence was not
            // declared; only a different code is reported.
            None
        }
        other => other,
    };

    let err = match exp.error.as_deref().filter(|want| !want.is_empty()) {
        Some(want) => match err {
            None if has_subject => {
                return ErrorVerdict::Terminal(EvalError::ExpectedError {
                    want: want.to_string(),
                });
            }
            None => None,
            Some(e) => {
                let got = e.to_string();
                if !got.contains(want) {
                    return ErrorVerdict::Retryable(EvalError::NotIn {
                        got,
                        want: want.to_string(),
                    });
                }
                None
            }
        },
        None => err,
    };

    match err {
        Some(e) => ErrorVerdict::Terminal(EvalError::Unexpected(e.to_string())),
        None => ErrorVerdict::Resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Disabled, PayloadOutcome};
    use crate::spec::MatchSource;
    use crate::store::Resource;
    use serde_json::{json, Value};

    fn pod(name: &str) -> Resource {
        Resource::new(json!({
            "kind": "Pod",
            "metadata": {"name": name},
            "status": {"phase": "Running"},
        }))
    }

    fn one(name: &str) -> Outcome {
        Outcome::from_one(Ok(pod(name)))
    }

    fn many(n: usize) -> Outcome {
        Outcome::from_many(Ok((0..n).map(|i| pod(&format!("pod-{i}"))).collect()))
    }

    #[test]
    fn test_no_expectation_no_error_passes() {
        let a = evaluate(None, one("web"), &Disabled);
        assert!(a.ok());
        assert!(!a.terminal());
    }

    #[test]
    fn test_no_expectation_error_is_terminal() {
        let outcome = Outcome::from_err(Some(StoreError::Other("boom".to_string())));
        let a = evaluate(None, outcome, &Disabled);
        assert!(!a.ok());
        assert!(a.terminal());
        assert_eq!(a.failures().len(), 1);
    }

    #[test]
    fn test_empty_expectation_passes_iff_no_error() {
        let exp = Expect::default();
        assert!(evaluate(Some(&exp), one("web"), &Disabled).ok());

        let outcome = Outcome::from_err(Some(StoreError::Other("boom".to_string())));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(!a.ok());
        assert!(a.terminal());
    }

    #[test]
    fn test_unknown_kind_not_expected_is_terminal() {
        let exp = Expect::default();
        let outcome = Outcome::from_err(Some(StoreError::KindUnknown("frobs".to_string())));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(!a.ok());
        assert!(a.terminal());
    }

    #[test]
    fn test_unknown_kind_expected_is_swallowed() {
        let exp = Expect {
            unknown: true,
            ..Expect::default()
        };
        let outcome = Outcome::from_err(Some(StoreError::KindUnknown("frobs".to_string())));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(a.ok(), "{:?}", a.failures());
    }

    #[test]
    fn test_not_found_expected_swallows_404() {
        let exp = Expect {
            notfound: true,
            ..Expect::default()
        };
        let outcome = Outcome::from_err(Some(StoreError::not_found("gone")));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(a.ok());
        assert!(a.failures().is_empty());
    }

    #[test]
    fn test_len_zero_counts_as_expecting_absence() {
        let exp = Expect {
            len: Some(0),
            ..Expect::default()
        };
        let outcome = Outcome::from_err(Some(StoreError::not_found("gone")));
        assert!(evaluate(Some(&exp), outcome, &Disabled).ok());
    }

    // Boundary condition carried over deliberately: a 500 status with
    // `notfound: true` is swallowed too, because expecting absence
    // disables the code check entirely rather than pinning it to 404.
    #[test]
    fn test_notfound_expected_swallows_any_status_code() {
        let exp = Expect {
            notfound: true,
            ..Expect::default()
        };
        let outcome = Outcome::from_err(Some(StoreError::Status {
            code: 500,
            message: "server exploded".to_string(),
        }));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(a.ok(), "{:?}", a.failures());
    }

    // The mirror asymmetry: a 404 status when absence was *not* expected
    // is silently accepted; only a non-404 code is reported.
    #[test]
    fn test_status_404_swallowed_even_when_absence_not_expected() {
        let exp = Expect::default();
        let outcome = Outcome::from_err(Some(StoreError::not_found("gone")));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(a.ok(), "{:?}", a.failures());
    }

    #[test]
    fn test_status_code_mismatch_is_retryable() {
        let exp = Expect::default();
        let outcome = Outcome::from_err(Some(StoreError::Status {
            code: 500,
            message: "server exploded".to_string(),
        }));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(!a.ok());
        assert!(!a.terminal());
        assert_eq!(
            a.failures(),
            [EvalError::ExpectedNotFound(
                "got status code 500".to_string()
            )]
        );
    }

    #[test]
    fn test_expected_error_but_clean_result_is_terminal() {
        let exp = Expect {
            error: Some("denied".to_string()),
            ..Expect::default()
        };
        let a = evaluate(Some(&exp), one("web"), &Disabled);
        assert!(!a.ok());
        assert!(a.terminal());
    }

    #[test]
    fn test_error_substring_mismatch_is_retryable() {
        let exp = Expect {
            error: Some("denied".to_string()),
            ..Expect::default()
        };
        let outcome = Outcome::from_err(Some(StoreError::Other("timed out".to_string())));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(!a.ok());
        assert!(!a.terminal());
    }

    #[test]
    fn test_error_substring_match_resolves_error() {
        let exp = Expect {
            error: Some("denied".to_string()),
            ..Expect::default()
        };
        let outcome = Outcome::from_err(Some(StoreError::Other(
            "permission denied for pods".to_string(),
        )));
        let a = evaluate(Some(&exp), outcome, &Disabled);
        assert!(a.ok(), "{:?}", a.failures());
    }

    #[test]
    fn test_len_mismatch_is_one_retryable_failure() {
        let exp = Expect {
            len: Some(2),
            matches: Some(MatchSource::Text("kind: Pod\n".to_string())),
            ..Expect::default()
        };
        let a = evaluate(Some(&exp), many(3), &Disabled);
        assert!(!a.terminal());
        assert_eq!(a.failures(), [EvalError::NotEqualLength { want: 2, got: 3 }]);
    }

    #[test]
    fn test_len_match_passes() {
        let exp = Expect {
            len: Some(3),
            ..Expect::default()
        };
        assert!(evaluate(Some(&exp), many(3), &Disabled).ok());
    }

    #[test]
    fn test_matches_ignored_for_list_outcomes() {
        let exp = Expect {
            matches: Some(MatchSource::Text("status:\n  phase: Failed\n".to_string())),
            ..Expect::default()
        };
        assert!(evaluate(Some(&exp), many(2), &Disabled).ok());
    }

    #[test]
    fn test_matches_diff_is_one_failure_per_field() {
        let exp = Expect {
            matches: Some(MatchSource::Text(
                "status:\n  phase: Failed\nmetadata:\n  name: api\n".to_string(),
            )),
            ..Expect::default()
        };
        let a = evaluate(Some(&exp), one("web"), &Disabled);
        assert!(!a.ok());
        assert!(!a.terminal());
        assert_eq!(a.failures().len(), 2);
        for failure in a.failures() {
            assert!(matches!(failure, EvalError::MatchesNotEqual(_)));
        }
    }

    #[test]
    fn test_matches_pass() {
        let exp = Expect {
            matches: Some(MatchSource::Text("status:\n  phase: Running\n".to_string())),
            ..Expect::default()
        };
        assert!(evaluate(Some(&exp), one("web"), &Disabled).ok());
    }

    #[test]
    fn test_malformed_matches_is_terminal() {
        let exp = Expect {
            matches: Some(MatchSource::Text("missing/match/file.yaml".to_string())),
            ..Expect::default()
        };
        let a = evaluate(Some(&exp), one("web"), &Disabled);
        assert!(a.terminal());
        assert!(matches!(a.failures()[0], EvalError::MatchesInvalid(_)));
    }

    struct RecordingEngine {
        outcome: PayloadOutcome,
    }

    impl PayloadAssertions for RecordingEngine {
        fn evaluate(&self, descriptor: &Value, payload: &[u8]) -> PayloadOutcome {
            assert!(descriptor.is_object());
            assert!(serde_json::from_slice::<Value>(payload).is_ok());
            self.outcome.clone()
        }
    }

    #[test]
    fn test_payload_failures_propagate_verbatim() {
        let exp = Expect {
            payload: Some(json!({"paths": {"$.status.phase": "Running"}})),
            ..Expect::default()
        };
        let engine = RecordingEngine {
            outcome: PayloadOutcome::fail_terminal(vec!["$.status.phase bad".to_string()]),
        };
        let a = evaluate(Some(&exp), one("web"), &engine);
        assert!(!a.ok());
        assert!(a.terminal());
        assert_eq!(
            a.failures(),
            [EvalError::Payload("$.status.phase bad".to_string())]
        );
    }

    #[test]
    fn test_payload_pass() {
        let exp = Expect {
            payload: Some(json!({"paths": {}})),
            ..Expect::default()
        };
        let engine = RecordingEngine {
            outcome: PayloadOutcome::pass(),
        };
        assert!(evaluate(Some(&exp), one("web"), &engine).ok());
    }
}
