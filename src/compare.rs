//! Partial-structural comparison of documents.
//!
//! [`compare`] checks an expected partial document against an actual one
//! and reports every field-path difference it finds, rooted at `$`. Only
//! fields present in the expected document are checked, so a match
//! document only needs the handful of fields the test author cares
//! about. Never short-circuits: the caller gets the full set of
//! mismatched fields in one pass.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;

use crate::spec::{probably_file_path, MatchSource};

/// The differences found by one comparison. Empty means no differences.
#[derive(Debug, Default)]
pub struct Delta {
    differences: Vec<String>,
}

impl Delta {
    fn add(&mut self, diff: String) {
        self.differences.push(diff);
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn differences(&self) -> &[String] {
        &self.differences
    }

    pub fn into_differences(self) -> Vec<String> {
        self.differences
    }
}

/// Resolve a declared `matches` value into the expected mapping.
///
/// Text is treated as inline YAML unless it looks like a file path, in
/// which case the file's content is read first. Mappings pass through
/// unchanged.
pub fn match_object_from_source(source: &MatchSource) -> Result<HashMap<String, Value>> {
    match source {
        MatchSource::Text(text) => {
            let content = if probably_file_path(text) {
                fs::read_to_string(text)
                    .with_context(|| format!("failed to read match file {text}"))?
            } else {
                text.clone()
            };
            serde_yaml::from_str(&content).context("failed to parse match document")
        }
        MatchSource::Mapping(map) => Ok(map.clone()),
    }
}

/// Compare an expected partial document against an actual document and
/// collect every field-path difference.
pub fn compare(expected: &HashMap<String, Value>, actual: &Value) -> Delta {
    let mut delta = Delta::default();
    let Some(subject) = actual.as_object() else {
        delta.add(format!(
            "$ non-comparable types: mapping and {}.",
            type_name(actual)
        ));
        return delta;
    };
    for (key, want) in expected {
        let path = format!("$.{key}");
        match subject.get(key) {
            Some(got) => collect_field_differences(&path, want, got, &mut delta),
            None => delta.add(format!("{path} not present in subject")),
        }
    }
    delta
}

fn collect_field_differences(path: &str, expected: &Value, actual: &Value, delta: &mut Delta) {
    if !types_comparable(expected, actual) {
        delta.add(format!(
            "{path} non-comparable types: {} and {}.",
            type_name(expected),
            type_name(actual)
        ));
        return;
    }
    match (expected, actual) {
        (Value::Object(want), Value::Object(got)) => {
            for (key, wantv) in want {
                let newpath = format!("{path}.{key}");
                match got.get(key) {
                    Some(gotv) => collect_field_differences(&newpath, wantv, gotv, delta),
                    None => delta.add(format!("{newpath} not present in subject")),
                }
            }
        }
        (Value::Array(want), Value::Array(got)) => {
            if want.len() != got.len() {
                delta.add(format!(
                    "{path} had different lengths. expected {} but found {}",
                    want.len(),
                    got.len()
                ));
                return;
            }
            // Sort order currently matters, unfortunately...
            for (x, wantv) in want.iter().enumerate() {
                let newpath = format!("{path}[{x}]");
                collect_field_differences(&newpath, wantv, &got[x], delta);
            }
        }
        (Value::Number(want), Value::Number(got)) if is_integer(want) && is_integer(got) => {
            if !integers_equal(want, got) {
                delta.add(different_values(path, expected, actual));
            }
        }
        (Value::Number(want), Value::String(got)) if is_integer(want) => {
            match got.parse::<i64>() {
                Ok(parsed) if want.as_i64() == Some(parsed) => {}
                Ok(_) | Err(_) => delta.add(different_values(path, expected, actual)),
            }
        }
        (Value::String(want), Value::Number(got)) if is_integer(got) => {
            if want != &got.to_string() {
                delta.add(different_values(path, expected, actual));
            }
        }
        (Value::String(want), Value::String(got)) => {
            if want != got {
                delta.add(different_values(path, expected, actual));
            }
        }
        // Booleans, floats, nulls: plain equality.
        _ => {
            if expected != actual {
                delta.add(different_values(path, expected, actual));
            }
        }
    }
}

/// Whether two values can be meaningfully compared at all. Integers and
/// strings are mutually comparable; everything else must match in kind.
fn types_comparable(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::String(_)) if is_integer(n) => true,
        (Value::String(_), Value::Number(n)) if is_integer(n) => true,
        (Value::Number(_), Value::Number(_)) => true,
        (Value::String(_), Value::String(_)) => true,
        (Value::Object(_), Value::Object(_)) => true,
        (Value::Array(_), Value::Array(_)) => true,
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

fn is_integer(n: &serde_json::Number) -> bool {
    n.is_i64() || n.is_u64()
}

/// Widening integer equality over the signed and unsigned 64-bit ranges.
fn integers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(av), Some(bv)) => av == bv,
        _ => a.as_u64() == b.as_u64() && a.as_u64().is_some(),
    }
}

fn different_values(path: &str, expected: &Value, actual: &Value) -> String {
    format!(
        "{path} had different values. expected {} but found {}",
        render(expected),
        render(actual)
    )
}

/// Scalar rendering without JSON string quoting, so diffs read the way
/// the values appear in the test file.
fn render(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
