//! Selector and update-operator vocabulary understood by every store.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::StoreError;

/// Conjunction of equality predicates over dotted paths
///
/// A path that crosses an array fans out over its elements, and an array
/// field matches when any element equals the expected value. An empty query
/// matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    predicates: BTreeMap<String, Value>,
}

impl Query {
    /// Query matching every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.predicates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.predicates.iter().all(|(path, expected)| {
            let mut found = Vec::new();
            collect_path(document, &path.split('.').collect::<Vec<_>>(), &mut found);

            if found.is_empty() {
                return expected.is_null();
            }

            found.iter().any(|actual| {
                *actual == expected
                    || matches!(actual, Value::Array(items) if !expected.is_array() && items.contains(expected))
            })
        })
    }
}

fn collect_path<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                collect_path(next, rest, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_path(item, segments, out);
            }
        }
        _ => {}
    }
}

/// One of the fixed update-operator shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Set each dotted path to its value, creating intermediate objects
    Set(Map<String, Value>),
    /// Remove every element of the array at `path` matching `matching`
    Pull { path: String, matching: Query },
    /// Append `value` to the array at `path`, creating it when absent
    Push { path: String, value: Value },
}

impl Update {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(path.into(), value.into());
        Update::Set(fields)
    }

    pub fn set_all(fields: Map<String, Value>) -> Self {
        Update::Set(fields)
    }

    /// Set each named path to `null`
    pub fn unset_all<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Update::Set(paths.into_iter().map(|p| (p.into(), Value::Null)).collect())
    }

    pub fn pull(path: impl Into<String>, matching: Query) -> Self {
        Update::Pull { path: path.into(), matching }
    }

    pub fn push(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::Push { path: path.into(), value: value.into() }
    }

    /// Apply the operator in place. Returns whether the document changed.
    pub fn apply(&self, document: &mut Value) -> Result<bool, StoreError> {
        match self {
            Update::Set(fields) => {
                let mut changed = false;
                for (path, value) in fields {
                    let slot = slot_mut(document, path, true)?
                        .ok_or_else(|| StoreError::Backend(format!("cannot create '{path}'")))?;
                    if *slot != *value {
                        *slot = value.clone();
                        changed = true;
                    }
                }
                Ok(changed)
            }
            Update::Pull { path, matching } => match slot_mut(document, path, false)? {
                None => Ok(false),
                Some(Value::Null) => Ok(false),
                Some(Value::Array(items)) => {
                    let before = items.len();
                    items.retain(|item| !matching.matches(item));
                    Ok(items.len() != before)
                }
                Some(_) => Err(StoreError::NotAnArray { path: path.clone() }),
            },
            Update::Push { path, value } => {
                let slot = slot_mut(document, path, true)?
                    .ok_or_else(|| StoreError::Backend(format!("cannot create '{path}'")))?;
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }
                match slot {
                    Value::Array(items) => {
                        items.push(value.clone());
                        Ok(true)
                    }
                    _ => Err(StoreError::NotAnArray { path: path.clone() }),
                }
            }
        }
    }
}

/// Mutable slot at a dotted path. With `create`, missing or null
/// intermediates become objects and the leaf is created as `null`.
fn slot_mut<'a>(
    document: &'a mut Value,
    path: &str,
    create: bool,
) -> Result<Option<&'a mut Value>, StoreError> {
    let mut current = document;
    for segment in path.split('.') {
        if create && current.is_null() {
            *current = Value::Object(Map::new());
        }
        let map = match current {
            Value::Object(map) => map,
            Value::Null => return Ok(None),
            _ => {
                return Err(StoreError::PathConflict {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        };
        current = if create {
            map.entry(segment.to_string()).or_insert(Value::Null)
        } else {
            match map.get_mut(segment) {
                Some(next) => next,
                None => return Ok(None),
            }
        };
    }
    Ok(Some(current))
}
