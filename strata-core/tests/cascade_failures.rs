//! Failure handling: delete policies, recursion bounds and failure broadcast

mod common;

use common::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;
use strata_core::cascade::{cascade_delete_with_policy, cascade_save, CascadeOperation};
use strata_core::prelude::*;

async fn parent_with_broken_children_array(db: &Database, store: &MemoryStore) -> (DocumentId, Child) {
    let parent = save_parent(db, "p", 1).await;
    let parent_id = parent.base.id.unwrap();

    let mut child = Child::new(parent_id, "c", "prop");
    db.collection("children").save_settled(&mut child).await.unwrap();

    // Corrupt the embedded array so the MANY rule fails
    db.collection("parents")
        .update_many(&Query::eq(ID_FIELD, parent_id), &Update::set("children", "oops"))
        .await
        .unwrap();
    assert_eq!(store.get("parents", parent_id).await.unwrap()["children"], json!("oops"));

    (parent_id, child)
}

#[tokio::test]
async fn test_best_effort_delete_runs_every_rule() {
    let (store, db) = memory_db();
    let (parent_id, child) = parent_with_broken_children_array(&db, &store).await;

    let err = cascade_delete_with_policy(&db.collection("children"), &child, DeletePolicy::BestEffort)
        .await
        .unwrap_err();

    match err {
        StrataError::Incomplete { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].is_store_error());
        }
        other => panic!("expected Incomplete, got {other:?}"),
    }

    // The rules around the failing one still ran
    let stored = store.get("parents", parent_id).await.unwrap();
    assert_eq!(stored["child"], serde_json::Value::Null);
    assert_eq!(stored["childProp"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_fail_fast_delete_stops_at_first_failure() {
    let (store, db) = memory_db();
    let (parent_id, child) = parent_with_broken_children_array(&db, &store).await;

    let err = cascade_delete_with_policy(&db.collection("children"), &child, DeletePolicy::FailFast)
        .await
        .unwrap_err();
    assert!(err.is_store_error());

    // The single embed ran before the failure, the root copy after it did not
    let stored = store.get("parents", parent_id).await.unwrap();
    assert_eq!(stored["child"], serde_json::Value::Null);
    assert_eq!(stored["childProp"], json!("prop"));
}

#[tokio::test]
async fn test_delete_policy_comes_from_config() {
    let (store, db) = configured_db(|config| config.cascade.delete_policy = DeletePolicy::FailFast);
    let (parent_id, mut child) = parent_with_broken_children_array(&db, &store).await;

    let (_, handle) = db.collection("children").delete_document(&mut child).await.unwrap();
    let err = handle.wait().await.unwrap_err();
    assert!(err.is_store_error());
    assert_eq!(store.get("parents", parent_id).await.unwrap()["childProp"], json!("prop"));
}

#[tokio::test]
async fn test_non_cascading_documents_never_touch_the_store() {
    let (store, db) = memory_db();
    let parent = Parent { bar: "p".into(), ..Default::default() };
    let before = store.stats().total();

    cascade_save(&db.collection("parents"), &parent).await.unwrap();
    cascade_delete_with_policy(&db.collection("parents"), &parent, DeletePolicy::FailFast)
        .await
        .unwrap();

    assert_eq!(store.stats().total(), before);
    assert_eq!(store.stats().finds.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_missing_identifier_fails_cascade() {
    let (_store, db) = memory_db();
    let child = Child::new(DocumentId::new(), "unsaved", "x");

    let err = cascade_save(&db.collection("children"), &child).await.unwrap_err();
    assert!(matches!(err, StrataError::MissingIdentifier { collection } if collection == "children"));
}

#[tokio::test]
async fn test_cyclic_nesting_is_detected() {
    let (_store, db) = memory_db();
    let nodes = db.collection("nodes");

    let mut a = Node::new("a");
    let mut b = Node::new("b");
    nodes.save(&mut a).await.unwrap().wait().await.unwrap();
    nodes.save(&mut b).await.unwrap().wait().await.unwrap();

    // b -> a is a plain chain
    b.peer = a.base.id;
    nodes.save(&mut b).await.unwrap().wait().await.unwrap();

    // a -> b -> a closes the loop
    a.peer = b.base.id;
    let err = nodes.save(&mut a).await.unwrap().wait().await.unwrap_err();
    match err {
        StrataError::CyclicCascade { collection, id } => {
            assert_eq!(collection, "nodes");
            assert_eq!(Some(id), a.base.id);
        }
        other => panic!("expected CyclicCascade, got {other:?}"),
    }

    // Both labels were still copied before the cycle was hit
    let stored_b: Node = nodes.find_by_id(b.base.id.unwrap()).await.unwrap();
    assert_eq!(stored_b.peer_label.as_deref(), Some("a"));
}

#[tokio::test]
async fn test_nest_depth_is_bounded() {
    let (store, db) = configured_db(|config| config.cascade.max_nest_depth = 2);
    let nodes = db.collection("nodes");

    // n2 -> n3 -> n4, written straight to the store
    let (n2, n3, n4) = (DocumentId::new(), DocumentId::new(), DocumentId::new());
    for (id, label, peer) in [(n2, "n2", Some(n3)), (n3, "n3", Some(n4)), (n4, "n4", None)] {
        store
            .insert_or_replace("nodes", id, json!({ "label": label, "peer": peer }))
            .await
            .unwrap();
    }

    let mut n1 = Node { peer: Some(n2), ..Node::new("n1") };
    let err = nodes.save(&mut n1).await.unwrap().wait().await.unwrap_err();
    assert!(matches!(err, StrataError::NestDepthExceeded { max_depth: 2 }));

    // Levels inside the bound were applied
    assert_eq!(store.get("nodes", n2).await.unwrap()["peer_label"], json!("n1"));
    assert_eq!(store.get("nodes", n3).await.unwrap()["peer_label"], json!("n2"));
}

#[tokio::test]
async fn test_background_failures_are_broadcast() {
    let (store, db) = memory_db();
    let mut failures = db.subscribe_failures();
    let (_, mut child) = parent_with_broken_children_array(&db, &store).await;

    // Saving again hits the corrupted array
    child.name = "renamed".into();
    let err = db.collection("children").save(&mut child).await.unwrap().wait().await.unwrap_err();
    assert!(err.is_store_error());

    let failure = failures.recv().await.unwrap();
    assert_eq!(failure.operation, CascadeOperation::Save);
    assert_eq!(failure.collection, "children");
    assert_eq!(failure.id, child.base.id);
    assert!(failure.message.contains("not an array"));
}

/// Child-like document whose after-save hook always fails
#[derive(Debug, Clone, Default, Serialize, Deserialize, Inspectable)]
struct AuditedChild {
    #[serde(flatten)]
    base: DocumentBase,
    parent_id: Option<DocumentId>,
    name: String,
}

impl Document for AuditedChild {
    document_base_methods!(base);

    fn capabilities(&self) -> Capabilities {
        Capabilities::BASE.with(Capability::Cascading).with(Capability::AfterSave)
    }

    fn after_save(&mut self, _collection: &Collection) -> anyhow::Result<()> {
        anyhow::bail!("audit log unavailable")
    }

    fn cascade(&self, collection: &Collection) -> Vec<CascadeConfig> {
        let conf = CascadeConfig::one(collection.database().collection("parents"))
            .through("child")
            .matching(Query::eq(ID_FIELD, self.parent_id))
            .data(json!({ "_id": self.base.id, "name": self.name }));
        vec![conf]
    }
}

#[tokio::test]
async fn test_failing_after_save_hook_still_cascades() {
    let (store, db) = memory_db();
    let parent = save_parent(&db, "p", 1).await;

    let mut child = AuditedChild { parent_id: parent.base.id, name: "audited".into(), ..Default::default() };
    let err = db.collection("audited").save(&mut child).await.unwrap_err();
    assert!(matches!(err, StrataError::Hook(_)));
    assert_eq!(err.to_string(), "audit log unavailable");
    assert_eq!(store.count("audited").await, 1);
    assert!(!child.is_new());

    db.shutdown().await;

    let p = fetch_parent(&db, parent.base.id).await;
    let embedded = p.child.unwrap();
    assert_eq!(embedded.name.as_deref(), Some("audited"));
    assert_eq!(embedded.id, child.base.id);
}
