//! The resource model and the store client seam.
//!
//! The harness never talks to a remote store directly. Callers inject an
//! implementation of [`ResourceStore`] and the runner invokes it at most
//! once per poll tick. Resources are unstructured documents: a
//! [`Resource`] wraps a `serde_json::Value` mapping and exposes the few
//! well-known fields the harness cares about (`kind`, `metadata.name`,
//! `metadata.namespace`).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;

/// An unstructured resource document.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    value: Value,
}

impl Resource {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The underlying document.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// The declared resource kind, if any.
    pub fn kind(&self) -> Option<&str> {
        self.value.get("kind").and_then(Value::as_str)
    }

    /// The `metadata.name` field, if any.
    pub fn name(&self) -> Option<&str> {
        self.value
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
    }

    /// The `metadata.namespace` field, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.value
            .get("metadata")
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
    }
}

/// The canonical addressable form of a declared resource kind, produced by
/// [`ResourceStore::resolve_kind`] from a kind name or alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindRef {
    pub canonical: String,
}

impl KindRef {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
        }
    }
}

/// What one action produced: a single item or a list, never both.
#[derive(Debug, Clone)]
pub enum Subject {
    One(Resource),
    Many(Vec<Resource>),
}

/// The (error, single-item, list) triple returned by one action
/// invocation, collapsed into the two fields that can actually be
/// populated together.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub err: Option<StoreError>,
    pub subject: Option<Subject>,
}

impl Outcome {
    /// Outcome of an action that returns a single item.
    pub fn from_one(result: Result<Resource, StoreError>) -> Self {
        match result {
            Ok(res) => Self {
                err: None,
                subject: Some(Subject::One(res)),
            },
            Err(err) => Self {
                err: Some(err),
                subject: None,
            },
        }
    }

    /// Outcome of an action that returns a list of items.
    pub fn from_many(result: Result<Vec<Resource>, StoreError>) -> Self {
        match result {
            Ok(items) => Self {
                err: None,
                subject: Some(Subject::Many(items)),
            },
            Err(err) => Self {
                err: Some(err),
                subject: None,
            },
        }
    }

    /// Outcome of an action that returns nothing on success, like delete.
    pub fn from_unit(result: Result<(), StoreError>) -> Self {
        Self {
            err: result.err(),
            subject: None,
        }
    }

    /// Outcome with only an error, used for prerequisite resolution.
    pub fn from_err(err: Option<StoreError>) -> Self {
        Self { err, subject: None }
    }
}

/// The remote, eventually-consistent resource store.
///
/// Implementations are treated as opaque and externally synchronized. The
/// harness holds no locks across ticks and invokes the store at most once
/// per tick; any cancellation of an in-flight remote call is the
/// implementation's own concern.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Translate a declared kind name or alias to its canonical
    /// addressable form.
    async fn resolve_kind(&self, kind: &str) -> Result<KindRef, StoreError>;

    async fn get(
        &self,
        kind: &KindRef,
        namespace: &str,
        name: &str,
    ) -> Result<Resource, StoreError>;

    async fn list(&self, kind: &KindRef, namespace: &str) -> Result<Vec<Resource>, StoreError>;

    async fn create(
        &self,
        kind: &KindRef,
        namespace: &str,
        resource: Resource,
    ) -> Result<Resource, StoreError>;

    async fn apply(
        &self,
        kind: &KindRef,
        namespace: &str,
        resource: Resource,
    ) -> Result<Resource, StoreError>;

    async fn delete(&self, kind: &KindRef, namespace: &str, name: &str)
        -> Result<(), StoreError>;

    async fn delete_collection(&self, kind: &KindRef, namespace: &str)
        -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_accessors() {
        let res = Resource::new(json!({
            "kind": "Pod",
            "metadata": {"name": "web", "namespace": "prod"},
        }));
        assert_eq!(res.kind(), Some("Pod"));
        assert_eq!(res.name(), Some("web"));
        assert_eq!(res.namespace(), Some("prod"));
    }

    #[test]
    fn test_resource_accessors_absent() {
        let res = Resource::new(json!({"spec": {}}));
        assert_eq!(res.kind(), None);
        assert_eq!(res.name(), None);
        assert_eq!(res.namespace(), None);
    }

    #[test]
    fn test_outcome_from_unit() {
        let ok = Outcome::from_unit(Ok(()));
        assert!(ok.err.is_none());
        assert!(ok.subject.is_none());

        let err = Outcome::from_unit(Err(StoreError::not_found("gone")));
        assert!(err.err.is_some());
    }
}
