//! Deadline-bounded polling with exponential backoff.
//!
//! The remote store is eventually consistent: a write may take time to
//! show up in reads. [`poll`] drives a caller-supplied action+evaluate
//! closure until it passes, fails terminally, or the deadline expires.
//! Each tick produces a fresh [`Assertions`]; only the most recent
//! attempt's failures survive, because retries are about catching up to
//! eventual state, not accumulating history.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::assertions::Assertions;

/// Deadline used when the caller does not supply one.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Backoff schedule and deadline for one poll session.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Overall bound on the session. Once it elapses no further ticks
    /// are scheduled; the in-flight tick is allowed to complete.
    pub deadline: Duration,
    /// Delay before the second tick. The first tick runs immediately.
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after each tick.
    pub multiplier: f64,
    /// Upper bound on the delay between ticks.
    pub max_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            initial_interval: Duration::from_millis(100),
            multiplier: 2.0,
            max_interval: Duration::from_secs(30),
        }
    }
}

impl PollConfig {
    /// Default schedule with an explicit deadline.
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Self::default()
        }
    }
}

/// Repeatedly run `tick` under the backoff schedule until it passes, a
/// terminal failure is reported, or the deadline expires.
///
/// Returns the last attempt's [`Assertions`], whichever way the session
/// ended; deadline exhaustion is not distinguished from terminal failure
/// here. `operation` is only used in diagnostics.
pub async fn poll<F, Fut>(operation: &str, config: &PollConfig, mut tick: F) -> Assertions
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Assertions>,
{
    let start = Instant::now();
    let mut delay = config.initial_interval;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let a = tick().await;
        let elapsed = start.elapsed();
        debug!(
            operation,
            attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = a.ok(),
            terminal = a.terminal(),
            "poll tick"
        );
        if a.ok() || a.terminal() {
            return a;
        }
        for failure in a.failures() {
            debug!(operation, attempt, failure = %failure, "assertion failed");
        }

        // The next tick would fire past the deadline: stop emitting and
        // surface this attempt's failures.
        if elapsed + delay >= config.deadline {
            return a;
        }
        tokio::time::sleep(delay).await;
        delay = Duration::from_secs_f64(
            (delay.as_secs_f64() * config.multiplier).min(config.max_interval.as_secs_f64()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::payload::Disabled;
    use crate::spec::Expect;
    use crate::store::Outcome;
    use crate::{assertions, store::Resource};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(deadline_ms: u64) -> PollConfig {
        PollConfig {
            deadline: Duration::from_millis(deadline_ms),
            initial_interval: Duration::from_millis(5),
            multiplier: 1.5,
            max_interval: Duration::from_millis(20),
        }
    }

    fn failing_outcome() -> Outcome {
        // Non-404 status with absence not expected: retryable forever.
        Outcome::from_err(Some(StoreError::Status {
            code: 500,
            message: "still broken".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_pass_on_first_tick() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let a = poll("op", &fast(200), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                assertions::evaluate(None, Outcome::from_unit(Ok(())), &Disabled)
            }
        })
        .await;
        assert!(a.ok());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminal_failure_stops_immediately() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let a = poll("op", &fast(500), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                let outcome = Outcome::from_err(Some(StoreError::Other("boom".to_string())));
                assertions::evaluate(None, outcome, &Disabled)
            }
        })
        .await;
        assert!(!a.ok());
        assert!(a.terminal());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_exhaustion_reports_last_attempt() {
        let exp = Expect::default();
        let exp = &exp;
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let a = poll("op", &fast(200), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                assertions::evaluate(Some(exp), failing_outcome(), &Disabled)
            }
        })
        .await;
        assert!(!a.ok());
        assert!(!a.terminal());
        // Failures are from the final attempt only.
        assert_eq!(a.failures().len(), 1);
        assert!(count.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_attempts_are_isolated() {
        // First attempt produces three structural failures, second passes:
        // nothing from the first attempt may leak into the result.
        let exp = Expect {
            matches: Some(crate::spec::MatchSource::Mapping(
                serde_json::from_value(json!({"a": 1, "b": 2, "c": 3})).unwrap(),
            )),
            ..Expect::default()
        };
        let exp = &exp;
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let a = poll("op", &fast(500), || {
            let c = c.clone();
            async move {
                let doc = if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    json!({"a": 9, "b": 9, "c": 9})
                } else {
                    json!({"a": 1, "b": 2, "c": 3})
                };
                let outcome = Outcome::from_one(Ok(Resource::new(doc)));
                assertions::evaluate(Some(exp), outcome, &Disabled)
            }
        })
        .await;
        assert!(a.ok(), "{:?}", a.failures());
        assert!(a.failures().is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_never_passing_tick_terminates() {
        let exp = Expect::default();
        let exp = &exp;
        let start = std::time::Instant::now();
        let a = poll("op", &fast(200), || async move {
            assertions::evaluate(Some(exp), failing_outcome(), &Disabled)
        })
        .await;
        assert!(!a.ok());
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
