//! Shared fixture documents for the integration tests
//!
//! Parents embed one child (`child`), a list of children (`children`) and a
//! root-level copy of the child's `childProp`. Children embed their sub child.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use strata_core::prelude::*;

pub const CHILD_REF_PROPS: [&str; 4] = ["_id", "name", "subChild.foo", "subChild._id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubChildRef {
    #[serde(rename = "_id", default)]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub foo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    #[serde(rename = "_id", default)]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "subChild", default)]
    pub sub_child: Option<SubChildRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Inspectable)]
pub struct Parent {
    #[serde(flatten)]
    pub base: DocumentBase,
    pub bar: String,
    pub number: i64,
    #[serde(default)]
    pub children: Vec<ChildRef>,
    #[serde(default)]
    pub child: Option<ChildRef>,
    #[serde(rename = "childProp", default)]
    pub child_prop: Option<String>,
}

impl Document for Parent {
    document_base_methods!(base);

    fn capabilities(&self) -> Capabilities {
        Capabilities::BASE
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Inspectable)]
pub struct Child {
    #[serde(flatten)]
    pub base: DocumentBase,
    #[serde(default)]
    pub parent_id: Option<DocumentId>,
    pub name: String,
    #[serde(rename = "subChild", default)]
    pub sub_child: Option<SubChildRef>,
    #[serde(rename = "childProp", default)]
    pub child_prop: String,
    #[serde(skip)]
    tracker: DiffTracker,
}

impl Child {
    pub fn new(parent_id: DocumentId, name: &str, child_prop: &str) -> Self {
        Self {
            parent_id: Some(parent_id),
            name: name.to_string(),
            child_prop: child_prop.to_string(),
            ..Default::default()
        }
    }
}

impl Tracked for Child {
    fn diff_tracker(&self) -> &DiffTracker {
        &self.tracker
    }

    fn diff_tracker_mut(&mut self) -> &mut DiffTracker {
        &mut self.tracker
    }
}

impl Document for Child {
    document_base_methods!(base);

    fn capabilities(&self) -> Capabilities {
        Capabilities::BASE.with(Capability::Cascading)
    }

    fn cascade(&self, collection: &Collection) -> Vec<CascadeConfig> {
        let parents = collection.database().collection("parents");
        let owner = Query::eq(ID_FIELD, self.parent_id);
        let previous = self
            .modified("parent_id")
            .then(|| self.original_value("parent_id"))
            .flatten()
            .filter(|id| !id.is_null())
            .map(|id| Query::eq(ID_FIELD, id));

        [
            CascadeConfig::one(parents.clone()).through("child").properties(CHILD_REF_PROPS),
            CascadeConfig::many(parents.clone()).through("children").properties(CHILD_REF_PROPS),
            CascadeConfig::one(parents).properties(["childProp"]),
        ]
        .into_iter()
        .map(|conf| {
            let conf = conf.matching(owner.clone());
            let conf = match &previous {
                Some(old) => conf.previously(old.clone()),
                None => conf,
            };
            conf.project(self).expect("child fields project cleanly")
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Inspectable)]
pub struct SubChild {
    #[serde(flatten)]
    pub base: DocumentBase,
    pub foo: String,
    pub child_id: Option<DocumentId>,
}

impl Document for SubChild {
    document_base_methods!(base);

    fn capabilities(&self) -> Capabilities {
        Capabilities::BASE.with(Capability::Cascading)
    }

    fn cascade(&self, collection: &Collection) -> Vec<CascadeConfig> {
        let children = collection.database().collection("children");
        let conf = CascadeConfig::one(children)
            .through("subChild")
            .matching(Query::eq(ID_FIELD, self.child_id))
            .properties(["_id", "foo"])
            .project(self)
            .expect("sub child fields project cleanly")
            .nest_as::<Child>();
        vec![conf]
    }
}

/// Self-referencing document: each node copies its label into its peer
#[derive(Debug, Clone, Default, Serialize, Deserialize, Inspectable)]
pub struct Node {
    #[serde(flatten)]
    pub base: DocumentBase,
    pub label: String,
    pub peer: Option<DocumentId>,
    #[serde(default)]
    pub peer_label: Option<String>,
}

impl Node {
    pub fn new(label: &str) -> Self {
        Self { label: label.to_string(), ..Default::default() }
    }
}

impl Document for Node {
    document_base_methods!(base);

    fn capabilities(&self) -> Capabilities {
        Capabilities::BASE.with(Capability::Cascading)
    }

    fn cascade(&self, collection: &Collection) -> Vec<CascadeConfig> {
        let conf = CascadeConfig::one(collection.clone())
            .through("peer_label")
            .matching(Query::eq(ID_FIELD, self.peer))
            .data(self.label.clone())
            .nest_as::<Node>();
        vec![conf]
    }
}

pub fn memory_db() -> (MemoryStore, Database) {
    let store = MemoryStore::new();
    let db = Database::with_store(store.clone());
    (store, db)
}

pub fn configured_db(configure: impl FnOnce(&mut StrataConfig)) -> (MemoryStore, Database) {
    let mut config = StrataConfig::default();
    configure(&mut config);
    let store = MemoryStore::new();
    let db = Database::new(Arc::new(store.clone()), &config).expect("valid test config");
    (store, db)
}

pub async fn save_parent(db: &Database, bar: &str, number: i64) -> Parent {
    let mut parent = Parent { bar: bar.to_string(), number, ..Default::default() };
    db.collection("parents").save(&mut parent).await.unwrap().wait().await.unwrap();
    parent
}

pub async fn fetch_parent(db: &Database, id: Option<DocumentId>) -> Parent {
    db.collection("parents").find_by_id(id.expect("saved parent has an id")).await.unwrap()
}
