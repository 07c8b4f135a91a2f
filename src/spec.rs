//! YAML test step schema and loading.
//!
//! A [`Spec`] declares exactly one action against the store plus an
//! optional [`Expect`] describing the outcome the author wants. The
//! action fields mirror the test file format:
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
//! String-valued action fields (`create`, `apply`, `delete`, and the
//! `matches` expectation) may be either inline YAML or a file path;
//! [`probably_file_path`] decides which.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::store::Resource;

/// Namespace used when neither the document nor the spec declares one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// One declared action and its expectations, loaded from YAML.
///
/// Exactly one of `get`, `create`, `apply`, `delete` should be set;
/// schema-level validation of that rule belongs to the surrounding test
/// file parser, not this crate.
#[derive(Debug, Clone, Deserialize)]
pub struct Spec {
    /// Human-readable name for this step, used in diagnostics.
    pub name: String,
    /// Namespace for actions whose documents do not declare one.
    #[serde(default)]
    pub namespace: Option<String>,
    /// `kind/name` to get a single item, or a bare kind to list.
    #[serde(default)]
    pub get: Option<String>,
    /// Inline YAML or a file path with one or more documents to create.
    #[serde(default)]
    pub create: Option<String>,
    /// Inline YAML or a file path with one or more documents to apply.
    #[serde(default)]
    pub apply: Option<String>,
    /// `kind/name`, a bare kind (delete the collection), or a file path.
    #[serde(default)]
    pub delete: Option<String>,
    /// Expectations about the action's outcome.
    #[serde(default, rename = "assert")]
    pub expect: Option<Expect>,
    /// Poll deadline in seconds. Defaults to 5 seconds when unset.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Spec {
    /// The namespace to use for documents that do not declare their own.
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// The declared poll deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// The set of checks declared for one action. Immutable once parsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expect {
    /// Substring any surfaced error message must contain.
    #[serde(default)]
    pub error: Option<String>,
    /// Expected item count for list outcomes. `0` implies the resource is
    /// expected to be absent.
    #[serde(default)]
    pub len: Option<usize>,
    /// Absence is expected.
    #[serde(default)]
    pub notfound: bool,
    /// An unknown-resource-kind error is expected.
    #[serde(default)]
    pub unknown: bool,
    /// Partial document to structurally compare against a single-item
    /// outcome. Inline YAML, a file path, or a mapping.
    #[serde(default)]
    pub matches: Option<MatchSource>,
    /// Descriptor forwarded verbatim to the payload assertion engine.
    #[serde(default)]
    pub payload: Option<Value>,
}

impl Expect {
    /// Whether the author expects the resource to be absent, either via
    /// `notfound: true` or `len: 0`.
    pub fn expects_not_found(&self) -> bool {
        self.len == Some(0) || self.notfound
    }
}

/// The `matches` field: inline YAML text, a file path, or a mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MatchSource {
    Text(String),
    Mapping(HashMap<String, Value>),
}

/// Load a spec from a YAML file.
pub fn load_spec(path: &Path) -> Result<Spec> {
    let content = fs::read_to_string(path).context("failed to read spec file")?;
    let spec: Spec = serde_yaml::from_str(&content).context("failed to parse spec YAML")?;
    Ok(spec)
}

/// Split a `get` or `delete` subject into kind and name. The name is
/// empty for bare-kind subjects, which address the whole collection.
pub fn split_kind_name(subject: &str) -> (&str, &str) {
    match subject.split_once('/') {
        Some((kind, name)) => (kind, name),
        None => (subject, ""),
    }
}

/// Heuristic for string fields that accept either inline YAML or a file
/// path. Inline YAML mappings always contain a colon, and bare
/// `kind/name` specifiers carry no file extension, so a single line
/// without a colon that ends in an extension is read as a path.
pub fn probably_file_path(subject: &str) -> bool {
    !subject.contains('\n')
        && !subject.contains(':')
        && Path::new(subject).extension().is_some()
}

/// Resolve a `create`/`apply`/`delete` body into resource documents.
///
/// The body is either inline YAML or a file path; either way the content
/// may hold multiple `---`-separated documents. Documents without a
/// `kind` field are skipped, matching how empty trailing documents show
/// up in hand-written manifests.
pub fn resources_from_source(body: &str) -> Result<Vec<Resource>> {
    let content = if probably_file_path(body) {
        fs::read_to_string(body)
            .with_context(|| format!("failed to read resource file {body}"))?
    } else {
        body.to_string()
    };

    let mut resources = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(&content) {
        let value = Value::deserialize(doc).context("failed to parse resource document")?;
        let resource = Resource::new(value);
        if resource.kind().is_some() {
            resources.push(resource);
        }
    }
    Ok(resources)
}
