use serde_json::Value;

use crate::error::{StrataError, StrataResult};

/// Registration-time accessor table for a document type
///
/// Implementations are normally generated with `#[derive(Inspectable)]`, which
/// emits one match arm per serialized field. Nothing here relies on runtime
/// reflection: an unknown field name simply yields `None`.
pub trait Inspectable {
    /// Serialized names of every top-level field this type exposes
    fn field_names(&self) -> Vec<&'static str>;

    /// Get the value of a specific top-level field by its serialized name
    /// Returns None if field doesn't exist
    fn get_field_value(&self, field_name: &str) -> Option<Value>;

    /// Get values for multiple fields at once
    fn get_field_values(&self, field_names: &[&str]) -> Vec<(String, Option<Value>)> {
        field_names.iter().map(|&name| (name.to_string(), self.get_field_value(name))).collect()
    }
}

/// Resolve a dotted path (`"child.name"`) against a document.
///
/// The first segment goes through the accessor table, the rest walks the
/// returned JSON value. A missing field or a `null` along the way yields
/// `Ok(None)`; descending into a scalar or an array is a `DotPathConflict`.
pub fn resolve_path(source: &dyn Inspectable, path: &str) -> StrataResult<Option<Value>> {
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();

    let Some(mut current) = source.get_field_value(head) else {
        return Ok(None);
    };

    for segment in segments {
        current = match current {
            Value::Object(mut map) => match map.remove(segment) {
                Some(next) => next,
                None => return Ok(None),
            },
            Value::Null => return Ok(None),
            _ => return Err(StrataError::DotPathConflict { path: path.to_string() }),
        };
    }

    Ok(Some(current))
}
