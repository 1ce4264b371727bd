//! Field-path projection.
//!
//! Turns a list of dotted paths into the nested object that gets embedded
//! in related documents: `["name", "sub.foo"]` on a child becomes
//! `{"name": ..., "sub": {"foo": ...}}`.

use serde_json::{Map, Value};

use crate::error::{StrataError, StrataResult};
use crate::inspect::{resolve_path, Inspectable};

/// Project `paths` from `source` into a nested object.
///
/// Fields missing on the source project as `null`. Reading through a scalar
/// on the source, or nesting a path under a key another path already filled
/// with a non-object, fails with `DotPathConflict` instead of overwriting.
pub fn project<S: AsRef<str>>(paths: &[S], source: &dyn Inspectable) -> StrataResult<Map<String, Value>> {
    let mut data = Map::new();

    for path in paths {
        let path = path.as_ref();
        let value = resolve_path(source, path)?.unwrap_or(Value::Null);

        let mut segments: Vec<&str> = path.split('.').collect();
        let leaf = segments.pop().unwrap_or_default();

        let mut current = &mut data;
        for segment in segments {
            let slot = current.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new()));
            current = match slot {
                Value::Object(map) => map,
                _ => return Err(StrataError::DotPathConflict { path: path.to_string() }),
            };
        }

        current.insert(leaf.to_string(), value);
    }

    Ok(data)
}
