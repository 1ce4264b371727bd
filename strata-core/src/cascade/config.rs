use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::projector::project;
use crate::collection::Collection;
use crate::document::{Document, DocumentId, ID_FIELD};
use crate::error::{StrataError, StrataResult};
use crate::inspect::Inspectable;
use crate::store::{Query, Update};

/// Cardinality of the embed, seen from the target document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelType {
    /// The target embeds a single object
    One,
    /// The target embeds an array of objects
    Many,
}

/// Legacy numeric codes: 0 = MANY, 1 = ONE
impl TryFrom<i64> for RelType {
    type Error = StrataError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RelType::Many),
            1 => Ok(RelType::One),
            other => Err(StrataError::InvalidRelationType(other.to_string())),
        }
    }
}

impl FromStr for RelType {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "one" => Ok(RelType::One),
            "many" => Ok(RelType::Many),
            _ => Err(StrataError::InvalidRelationType(s.to_string())),
        }
    }
}

/// One (field, value) predicate identifying the source inside a target array
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceField {
    pub name: String,
    pub value: Value,
}

impl ReferenceField {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Materializes re-fetched owners so nested cascades can run on them
pub type DocumentFactory = Arc<dyn Fn(Value) -> StrataResult<Box<dyn Document>> + Send + Sync>;

/// One propagation rule
///
/// Built fresh by [`Document::cascade`] on every save or delete, consumed by
/// the orchestrator, then dropped.
#[derive(Clone)]
pub struct CascadeConfig {
    /// Target collection to update
    pub collection: Collection,
    pub rel_type: RelType,
    /// Where the embed lives in the target; `None` writes `data` at the root
    pub through_prop: Option<String>,
    /// Current owner(s)
    pub query: Query,
    /// Previous owner(s), set only when the association moved
    pub old_query: Option<Query>,
    /// Root-level fields cleared on cleanup when there is no through property
    pub properties: Vec<String>,
    /// Snapshot to embed
    pub data: Value,
    /// Set when nested cascades should run on the re-fetched owners
    pub instance: Option<DocumentFactory>,
    /// Only run the cleanup half
    pub remove_only: bool,
    /// Identifies the source inside a MANY array; defaults to `_id`
    pub reference_query: Vec<ReferenceField>,
}

impl CascadeConfig {
    pub fn new(collection: Collection, rel_type: RelType) -> Self {
        Self {
            collection,
            rel_type,
            through_prop: None,
            query: Query::all(),
            old_query: None,
            properties: Vec::new(),
            data: Value::Null,
            instance: None,
            remove_only: false,
            reference_query: Vec::new(),
        }
    }

    pub fn one(collection: Collection) -> Self {
        Self::new(collection, RelType::One)
    }

    pub fn many(collection: Collection) -> Self {
        Self::new(collection, RelType::Many)
    }

    pub fn through(mut self, prop: impl Into<String>) -> Self {
        self.through_prop = Some(prop.into());
        self
    }

    pub fn matching(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn previously(mut self, old_query: Query) -> Self {
        self.old_query = Some(old_query);
        self
    }

    pub fn properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// Build `data` by projecting `properties` from `source`
    pub fn project(mut self, source: &dyn Inspectable) -> StrataResult<Self> {
        self.data = Value::Object(project(&self.properties, source)?);
        Ok(self)
    }

    /// Re-run cascades on every owner after updating it, materialized as `T`
    pub fn nest_as<T>(mut self) -> Self
    where
        T: Document + DeserializeOwned + 'static,
    {
        self.instance = Some(Arc::new(|value: Value| -> StrataResult<Box<dyn Document>> {
            let doc: T = serde_json::from_value(value)?;
            Ok(Box::new(doc) as Box<dyn Document>)
        }));
        self
    }

    pub fn remove_only(mut self) -> Self {
        self.remove_only = true;
        self
    }

    pub fn reference(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.reference_query.push(ReferenceField::new(name, value));
        self
    }

    pub fn nest(&self) -> bool {
        self.instance.is_some()
    }

    /// Reference predicate, defaulting to the source identifier
    pub(crate) fn resolved_reference(
        &self,
        source_collection: &str,
        source_id: Option<DocumentId>,
    ) -> StrataResult<Query> {
        if self.reference_query.is_empty() {
            let id = source_id.ok_or_else(|| StrataError::MissingIdentifier {
                collection: source_collection.to_string(),
            })?;
            return Ok(Query::eq(ID_FIELD, id));
        }

        Ok(self
            .reference_query
            .iter()
            .fold(Query::all(), |query, field| query.and(field.name.clone(), field.value.clone())))
    }

    /// Update nulling the previous embed, if there is anything to clear
    pub(crate) fn clear_update(&self) -> Option<Update> {
        match &self.through_prop {
            Some(through) => Some(Update::unset_all([through.clone()])),
            None if self.properties.is_empty() => None,
            None => Some(Update::unset_all(self.properties.iter().cloned())),
        }
    }

    /// Update writing the new embed of a ONE relation
    pub(crate) fn embed_update(&self) -> StrataResult<Update> {
        match (&self.through_prop, &self.data) {
            (Some(through), data) => Ok(Update::set(through.clone(), data.clone())),
            (None, Value::Object(fields)) => Ok(Update::set_all(fields.clone())),
            (None, other) => Err(StrataError::InvalidCascadeData(format!(
                "root-level embed into '{}' needs object data, got {}",
                self.collection.name(),
                other
            ))),
        }
    }

    /// Embedded array path of a MANY relation
    pub(crate) fn array_path(&self) -> StrataResult<&str> {
        self.through_prop.as_deref().ok_or_else(|| {
            StrataError::InvalidCascadeData(format!(
                "MANY relation into '{}' requires a through property",
                self.collection.name()
            ))
        })
    }
}

impl fmt::Debug for CascadeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeConfig")
            .field("collection", &self.collection.name())
            .field("rel_type", &self.rel_type)
            .field("through_prop", &self.through_prop)
            .field("query", &self.query)
            .field("old_query", &self.old_query)
            .field("properties", &self.properties)
            .field("data", &self.data)
            .field("nest", &self.nest())
            .field("remove_only", &self.remove_only)
            .field("reference_query", &self.reference_query)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_rel_type_parsing() {
        assert_eq!(RelType::try_from(0).unwrap(), RelType::Many);
        assert_eq!(RelType::try_from(1).unwrap(), RelType::One);
        assert!(matches!(RelType::try_from(7), Err(StrataError::InvalidRelationType(code)) if code == "7"));
        assert_eq!("ONE".parse::<RelType>().unwrap(), RelType::One);
        assert_eq!("many".parse::<RelType>().unwrap(), RelType::Many);
        assert!("several".parse::<RelType>().is_err());
    }

    #[tokio::test]
    async fn test_reference_defaults_to_source_id() {
        let db = Database::with_store(MemoryStore::new());
        let conf = CascadeConfig::many(db.collection("parents")).through("children");
        let id = DocumentId::new();

        assert_eq!(conf.resolved_reference("children", Some(id)).unwrap(), Query::eq(ID_FIELD, id));
        assert!(matches!(
            conf.resolved_reference("children", None),
            Err(StrataError::MissingIdentifier { collection }) if collection == "children"
        ));

        let explicit = conf.reference("slug", "abc").reference("kind", "child");
        assert_eq!(
            explicit.resolved_reference("children", None).unwrap(),
            Query::eq("slug", "abc").and("kind", "child")
        );
    }

    #[tokio::test]
    async fn test_clear_and_embed_updates() {
        let db = Database::with_store(MemoryStore::new());
        let through = CascadeConfig::one(db.collection("parents")).through("child").data(json!({ "n": 1 }));
        assert_eq!(through.clear_update(), Some(Update::unset_all(["child"])));
        assert_eq!(through.embed_update().unwrap(), Update::set("child", json!({ "n": 1 })));

        let root = CascadeConfig::one(db.collection("parents"))
            .properties(["childProp"])
            .data(json!({ "childProp": "x" }));
        assert_eq!(root.clear_update(), Some(Update::unset_all(["childProp"])));
        assert_eq!(root.embed_update().unwrap(), Update::set("childProp", "x"));

        let bare = CascadeConfig::one(db.collection("parents")).data("scalar");
        assert_eq!(bare.clear_update(), None);
        assert!(matches!(bare.embed_update(), Err(StrataError::InvalidCascadeData(_))));
        assert!(bare.array_path().is_err());
    }
}
