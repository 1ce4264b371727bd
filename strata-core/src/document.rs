//! Document model: identifiers, the capability set and the `Document` trait.
//!
//! A document type declares which optional behaviors it implements through
//! [`Document::capabilities`]. The collection wrapper and the cascade engine
//! only invoke a hook when its capability is present, so every hook carries a
//! harmless default body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

use crate::cascade::CascadeConfig;
use crate::collection::Collection;
use crate::inspect::Inspectable;

/// Serialized name of the identifier field on every stored document
pub const ID_FIELD: &str = "_id";

/// Unique identifier of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

#[allow(clippy::new_without_default)]
impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse_str(input: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(input).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.0.to_string())
    }
}

/// Optional behaviors a document type can opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Capability {
    BeforeSave = 1 << 0,
    AfterSave = 1 << 1,
    BeforeDelete = 1 << 2,
    AfterDelete = 1 << 3,
    AfterFind = 1 << 4,
    Validatable = 1 << 5,
    Cascading = 1 << 6,
    NewTrackable = 1 << 7,
    TimeCreated = 1 << 8,
    TimeModified = 1 << 9,
}

/// Finite set of [`Capability`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    /// Capabilities provided by [`DocumentBase`]
    pub const BASE: Capabilities = Capabilities::of(&[
        Capability::NewTrackable,
        Capability::TimeCreated,
        Capability::TimeModified,
    ]);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn of(capabilities: &[Capability]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < capabilities.len() {
            bits |= capabilities[i] as u16;
            i += 1;
        }
        Self(bits)
    }

    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability as u16)
    }

    pub const fn union(self, other: Capabilities) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(&self, capability: Capability) -> bool {
        self.0 & capability as u16 != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// A persisted entity
///
/// Every document has an identifier; everything else is opt-in through
/// [`Document::capabilities`].
pub trait Document: Inspectable + Send + Sync {
    fn id(&self) -> Option<DocumentId>;

    fn set_id(&mut self, id: DocumentId);

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    fn before_save(&mut self, _collection: &Collection) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_save(&mut self, _collection: &Collection) -> anyhow::Result<()> {
        Ok(())
    }

    fn before_delete(&mut self, _collection: &Collection) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_delete(&mut self, _collection: &Collection) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_find(&mut self, _collection: &Collection) -> anyhow::Result<()> {
        Ok(())
    }

    /// Validation messages; an empty list means the document is valid
    fn validate(&self, _collection: &Collection) -> Vec<String> {
        Vec::new()
    }

    /// Propagation rules to run after this document is saved or deleted
    fn cascade(&self, _collection: &Collection) -> Vec<CascadeConfig> {
        Vec::new()
    }

    fn is_new(&self) -> bool {
        true
    }

    fn set_is_new(&mut self, _is_new: bool) {}

    fn set_created_at(&mut self, _at: DateTime<Utc>) {}

    fn set_updated_at(&mut self, _at: DateTime<Utc>) {}
}

/// Common fields for stored documents
///
/// Embed it with `#[serde(flatten)]` and forward the identity, newness and
/// timestamp methods with [`crate::document_base_methods!`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentBase {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    // Defaults to false so a fresh value counts as new
    #[serde(skip)]
    exists: bool,
}

impl DocumentBase {
    pub fn is_new(&self) -> bool {
        !self.exists
    }

    pub fn set_is_new(&mut self, is_new: bool) {
        self.exists = !is_new;
    }
}

impl PartialEq for DocumentBase {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
    }
}

impl Inspectable for DocumentBase {
    fn field_names(&self) -> Vec<&'static str> {
        vec![ID_FIELD, "created_at", "updated_at"]
    }

    fn get_field_value(&self, field_name: &str) -> Option<Value> {
        match field_name {
            ID_FIELD => Some(self.id.map(Value::from).unwrap_or(Value::Null)),
            "created_at" => Some(json!(self.created_at)),
            "updated_at" => Some(json!(self.updated_at)),
            _ => None,
        }
    }
}

/// Forward the [`Document`] identity, newness and timestamp methods to an
/// embedded [`DocumentBase`] field. Use inside an `impl Document for ...` block.
#[macro_export]
macro_rules! document_base_methods {
    ($field:ident) => {
        fn id(&self) -> Option<$crate::document::DocumentId> {
            self.$field.id
        }

        fn set_id(&mut self, id: $crate::document::DocumentId) {
            self.$field.id = Some(id);
        }

        fn is_new(&self) -> bool {
            self.$field.is_new()
        }

        fn set_is_new(&mut self, is_new: bool) {
            self.$field.set_is_new(is_new);
        }

        fn set_created_at(&mut self, at: $crate::chrono::DateTime<$crate::chrono::Utc>) {
            self.$field.created_at = Some(at);
        }

        fn set_updated_at(&mut self, at: $crate::chrono::DateTime<$crate::chrono::Utc>) {
            self.$field.updated_at = Some(at);
        }
    };
}
