//! Seam for the external payload assertion engine.
//!
//! Path-based value, format, and schema checks against a serialized
//! document are not this crate's business. The evaluator hands the
//! engine a descriptor (taken verbatim from the `payload` expectation
//! field) and the subject's canonical JSON bytes, and propagates what
//! comes back without interpretation.

use serde_json::Value;

/// What the payload engine decided about one subject.
#[derive(Debug, Clone)]
pub struct PayloadOutcome {
    pub pass: bool,
    /// Whether a failure should end the poll session rather than retry.
    pub terminal: bool,
    pub failures: Vec<String>,
}

impl PayloadOutcome {
    pub fn pass() -> Self {
        Self {
            pass: true,
            terminal: false,
            failures: Vec::new(),
        }
    }

    pub fn fail(failures: Vec<String>) -> Self {
        Self {
            pass: false,
            terminal: false,
            failures,
        }
    }

    pub fn fail_terminal(failures: Vec<String>) -> Self {
        Self {
            pass: false,
            terminal: true,
            failures,
        }
    }
}

/// An engine that evaluates a payload assertion descriptor against the
/// canonical byte representation of a subject.
pub trait PayloadAssertions: Send + Sync {
    fn evaluate(&self, descriptor: &Value, payload: &[u8]) -> PayloadOutcome;
}

/// Placeholder engine for callers whose test files never use `payload`
/// expectations. Reaching it is a terminal failure, not a retry.
#[derive(Debug, Default)]
pub struct Disabled;

impl PayloadAssertions for Disabled {
    fn evaluate(&self, _descriptor: &Value, _payload: &[u8]) -> PayloadOutcome {
        PayloadOutcome::fail_terminal(vec![
            "no payload assertion engine configured".to_string()
        ])
    }
}
