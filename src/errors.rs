//! Error taxonomy for store actions and assertion evaluation.
//!
//! Two families live here. [`StoreError`] is what a [`ResourceStore`]
//! implementation surfaces from an action: an unknown-kind sentinel, a
//! structured status error carrying a numeric code, or an opaque error.
//! [`EvalError`] is a failed assertion as reported to the caller's failure
//! sink. Which `EvalError` variants end a poll session and which are
//! retried is decided by the evaluator in `assertions`, not here.
//!
//! [`ResourceStore`]: crate::store::ResourceStore

use thiserror::Error;

/// The well-known status code meaning "the resource does not exist".
pub const NOT_FOUND: u16 = 404;

/// An error surfaced from a resource store action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The declared resource kind could not be resolved to an addressable
    /// form. Raised by `resolve_kind`, and by actions handed a kind the
    /// store has never heard of.
    #[error("resource kind unknown: {0}")]
    KindUnknown(String),

    /// A structured error carrying a status code, like one returned from a
    /// get or delete against a missing resource.
    #[error("status code {code}: {message}")]
    Status { code: u16, message: String },

    /// Any other error. Treated as opaque and unexpected by the evaluator.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Shorthand for the not-found status error.
    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError::Status {
            code: NOT_FOUND,
            message: message.into(),
        }
    }
}

/// A single failed assertion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// An error surfaced from the action that no expectation accounts for.
    #[error("unexpected error: {0}")]
    Unexpected(String),

    /// The expectation declared an error substring but the action produced
    /// a non-error result.
    #[error("expected an error containing {want:?} but none occurred")]
    ExpectedError { want: String },

    /// An error occurred but its message does not contain the expected
    /// substring.
    #[error("expected error containing {want:?}, got {got:?}")]
    NotIn { got: String, want: String },

    /// Expected the resource to be absent but the store said otherwise.
    #[error("expected not found: {0}")]
    ExpectedNotFound(String),

    /// A list outcome had the wrong number of items.
    #[error("expected length of {want} but found {got}")]
    NotEqualLength { want: usize, got: usize },

    /// The declared partial-match document could not be resolved.
    #[error("matches not well-formed: {0}")]
    MatchesInvalid(String),

    /// One field-path difference between the match document and the
    /// retrieved resource.
    #[error("match field not equal: {0}")]
    MatchesNotEqual(String),

    /// A failure reported by the delegated payload assertion engine.
    #[error("payload assertion failed: {0}")]
    Payload(String),
}
