//! Drives one declared action against the store.
//!
//! A [`Runner`] borrows the injected [`ResourceStore`] and payload
//! engine and executes a [`Spec`]: resolve the declared kind, perform
//! the action under the poll controller, evaluate the outcome, and hand
//! back the final attempt's failures. Kind resolution is a non-retryable
//! prerequisite: it is evaluated once, through the same evaluator, so an
//! unresolvable kind reports like any other failed assertion instead of
//! taking a separate code path.
//!
//! Independent action+expectation pairs within one spec (a create body
//! holding several documents, say) run strictly in sequence, each with
//! its own fresh poll session.

use anyhow::Result;

use crate::assertions::{evaluate, Assertions};
use crate::errors::EvalError;
use crate::payload::PayloadAssertions;
use crate::poll::{poll, PollConfig};
use crate::spec::{probably_file_path, resources_from_source, split_kind_name, Spec};
use crate::store::{KindRef, Outcome, Resource, ResourceStore};

/// Executes declared actions against an injected store.
pub struct Runner<'a> {
    store: &'a dyn ResourceStore,
    payload: &'a dyn PayloadAssertions,
}

impl<'a> Runner<'a> {
    pub fn new(store: &'a dyn ResourceStore, payload: &'a dyn PayloadAssertions) -> Self {
        Self { store, payload }
    }

    /// Run every action the spec declares, in declaration order, and
    /// collect the surviving failures for the caller's sink. An empty
    /// result means the spec passed.
    pub async fn run(&self, spec: &Spec) -> Result<Vec<EvalError>> {
        let mut failures = Vec::new();
        if let Some(subject) = &spec.get {
            failures.extend(self.run_get(spec, subject).await?);
        }
        if let Some(body) = &spec.create {
            failures.extend(self.run_write(spec, body, Verb::Create).await?);
        }
        if let Some(body) = &spec.delete {
            failures.extend(self.run_delete(spec, body).await?);
        }
        if let Some(body) = &spec.apply {
            failures.extend(self.run_write(spec, body, Verb::Apply).await?);
        }
        Ok(failures)
    }

    /// Get a single item (`kind/name`) or list a collection (bare kind),
    /// retrying under the poll controller until the expectations settle.
    async fn run_get(&self, spec: &Spec, subject: &str) -> Result<Vec<EvalError>> {
        let (kind, name) = split_kind_name(subject);
        let exp = spec.expect.as_ref();

        let kref = match self.resolve_prerequisite(spec, kind).await {
            Ok(Some(kref)) => kref,
            Ok(None) => return Ok(Vec::new()),
            Err(failures) => return Ok(failures),
        };

        let ns = spec.namespace();
        let kref = &kref;
        let a = poll(&spec.name, &self.poll_config(spec), || async move {
            let outcome = if name.is_empty() {
                Outcome::from_many(self.store.list(kref, ns).await)
            } else {
                Outcome::from_one(self.store.get(kref, ns, name).await)
            };
            evaluate(exp, outcome, self.payload)
        })
        .await;
        Ok(self.sink(a))
    }

    /// Create or apply every document in the body, each judged with the
    /// spec's expectation under its own poll session.
    async fn run_write(&self, spec: &Spec, body: &str, verb: Verb) -> Result<Vec<EvalError>> {
        let docs = resources_from_source(body)?;
        let exp = spec.expect.as_ref();
        let mut failures = Vec::new();

        for obj in docs {
            let kind = obj.kind().unwrap_or_default();
            let kref = match self.resolve_prerequisite(spec, kind).await {
                Ok(Some(kref)) => kref,
                Ok(None) => continue,
                Err(prereq) => {
                    failures.extend(prereq);
                    return Ok(failures);
                }
            };
            let ns = obj
                .namespace()
                .unwrap_or_else(|| spec.namespace())
                .to_string();

            let kref = &kref;
            let ns = ns.as_str();
            let obj = &obj;
            let a = poll(&spec.name, &self.poll_config(spec), || {
                let obj = obj.clone();
                async move {
                    let result = match verb {
                        Verb::Create => self.store.create(kref, ns, obj).await,
                        Verb::Apply => self.store.apply(kref, ns, obj).await,
                    };
                    evaluate(exp, Outcome::from_one(result), self.payload)
                }
            })
            .await;
            failures.extend(self.sink(a));
        }
        Ok(failures)
    }

    /// Delete by document file, by `kind/name`, or a whole collection for
    /// a bare kind.
    async fn run_delete(&self, spec: &Spec, body: &str) -> Result<Vec<EvalError>> {
        let exp = spec.expect.as_ref();

        if probably_file_path(body) {
            let docs = resources_from_source(body)?;
            let mut failures = Vec::new();
            for obj in docs {
                let kind = obj.kind().unwrap_or_default();
                let kref = match self.resolve_prerequisite(spec, kind).await {
                    Ok(Some(kref)) => kref,
                    Ok(None) => continue,
                    Err(prereq) => {
                        failures.extend(prereq);
                        return Ok(failures);
                    }
                };
                let name = obj.name().unwrap_or_default().to_string();
                let ns = obj
                    .namespace()
                    .unwrap_or_else(|| spec.namespace())
                    .to_string();
                let (kref, ns, name) = (&kref, ns.as_str(), name.as_str());
                let a = poll(&spec.name, &self.poll_config(spec), || async move {
                    let outcome = Outcome::from_unit(self.store.delete(kref, ns, name).await);
                    evaluate(exp, outcome, self.payload)
                })
                .await;
                failures.extend(self.sink(a));
            }
            return Ok(failures);
        }

        let (kind, name) = split_kind_name(body);
        let kref = match self.resolve_prerequisite(spec, kind).await {
            Ok(Some(kref)) => kref,
            Ok(None) => return Ok(Vec::new()),
            Err(failures) => return Ok(failures),
        };
        let ns = spec.namespace();
        let kref = &kref;
        let a = poll(&spec.name, &self.poll_config(spec), || async move {
            let result = if name.is_empty() {
                self.store.delete_collection(kref, ns).await
            } else {
                self.store.delete(kref, ns, name).await
            };
            evaluate(exp, Outcome::from_unit(result), self.payload)
        })
        .await;
        Ok(self.sink(a))
    }

    /// Resolve a declared kind once, before any polling, running the
    /// result through the evaluator.
    ///
    /// Returns `Ok(Some(_))` to proceed, `Ok(None)` when resolution
    /// failed but the expectation accounts for it (nothing further can be
    /// addressed), and `Err(failures)` to short-circuit the action.
    async fn resolve_prerequisite(
        &self,
        spec: &Spec,
        kind: &str,
    ) -> Result<Option<KindRef>, Vec<EvalError>> {
        let (kref, err) = match self.store.resolve_kind(kind).await {
            Ok(kref) => (Some(kref), None),
            Err(e) => (None, Some(e)),
        };
        let a = evaluate(spec.expect.as_ref(), Outcome::from_err(err), self.payload);
        if !a.ok() {
            return Err(a.into_failures());
        }
        Ok(kref)
    }

    fn poll_config(&self, spec: &Spec) -> PollConfig {
        spec.timeout()
            .map(PollConfig::with_deadline)
            .unwrap_or_default()
    }

    fn sink(&self, a: Assertions) -> Vec<EvalError> {
        if a.ok() {
            Vec::new()
        } else {
            a.into_failures()
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Create,
    Apply,
}
