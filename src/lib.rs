//! # eventide
//!
//! A declarative test harness core for eventually-consistent resource
//! stores.
//!
//! A test author declares, in YAML, an action against a remote store
//! (get, list, create, apply, delete) and a set of expectations about
//! the outcome. The harness performs the action through an injected
//! [`ResourceStore`] and evaluates the expectations with automatic
//! retry until they pass, a non-recoverable condition is detected, or a
//! deadline expires.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eventide::{load_spec, payload, Runner};
//!
//! #[tokio::test]
//! async fn test_deployment_scales() {
//!     let spec = load_spec("testdata/deployment-ready.yaml".as_ref()).unwrap();
//!     let store = my_store_client();
//!
//!     let runner = Runner::new(&store, &payload::Disabled);
//!     let failures = runner.run(&spec).await.unwrap();
//!     assert!(failures.is_empty(), "{failures:?}");
//! }
//! ```
//!
//! ## Expectations
//!
//! ```yaml
//! name: check deployment's ready replicas is 2
//! get: deployments/my-deployment
//! assert:
//!   matches: |
//!     status:
//!       readyReplicas: 2
//! ```
//!
//! Only the fields present in `matches` are compared; everything else in
//! the retrieved document is ignored. Expectations that fail because the
//! store has not caught up yet are retried under an exponential backoff
//! bounded by the spec's `timeout` (default 5 seconds).

pub mod assertions;
pub mod compare;
pub mod errors;
pub mod payload;
pub mod poll;
pub mod runner;
pub mod spec;
pub mod store;

// Evaluation core
pub use assertions::{evaluate, Assertions};
pub use compare::{compare, match_object_from_source, Delta};
pub use errors::{EvalError, StoreError, NOT_FOUND};

// Declared specs
pub use spec::{load_spec, split_kind_name, Expect, MatchSource, Spec};

// Store seam and action driving
pub use payload::{PayloadAssertions, PayloadOutcome};
pub use poll::{poll, PollConfig, DEFAULT_DEADLINE};
pub use runner::Runner;
pub use store::{KindRef, Outcome, Resource, ResourceStore, Subject};
