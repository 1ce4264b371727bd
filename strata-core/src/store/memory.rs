use async_trait::async_trait;
use scc::HashMap as SccHashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{DeleteResult, DocumentStore, Query, Update, UpdateResult};
use crate::document::{DocumentId, ID_FIELD};
use crate::error::StoreError;

type CollectionMap = BTreeMap<DocumentId, Value>;

/// In-process document store backed by SCC's concurrent HashMap
///
/// One map entry per collection; each entry holds the collection's documents
/// ordered by identifier. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<SccHashMap<String, CollectionMap>>,
    stats: Arc<MemoryStoreStats>,
}

#[derive(Debug, Default)]
pub struct MemoryStoreStats {
    pub finds: AtomicU64,
    pub writes: AtomicU64,
    pub deletes: AtomicU64,
}

impl MemoryStoreStats {
    /// Total number of operations issued against the store
    pub fn total(&self) -> u64 {
        self.finds.load(Ordering::Relaxed)
            + self.writes.load(Ordering::Relaxed)
            + self.deletes.load(Ordering::Relaxed)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &MemoryStoreStats {
        &self.stats
    }

    /// Number of documents stored in `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.collections.read_async(collection, |_, docs| docs.len()).await.unwrap_or(0)
    }

    /// Fetch one document by identifier without touching the statistics
    pub async fn get(&self, collection: &str, id: DocumentId) -> Option<Value> {
        self.collections.read_async(collection, |_, docs| docs.get(&id).cloned()).await.flatten()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.stats.finds.fetch_add(1, Ordering::Relaxed);
        let found = self
            .collections
            .read_async(collection, |_, docs| {
                docs.values().filter(|doc| query.matches(doc)).cloned().collect::<Vec<_>>()
            })
            .await;
        Ok(found.unwrap_or_default())
    }

    async fn insert_or_replace(
        &self,
        collection: &str,
        id: DocumentId,
        mut document: Value,
    ) -> Result<(), StoreError> {
        let Value::Object(fields) = &mut document else {
            return Err(StoreError::NotAnObject { collection: collection.to_string() });
        };
        fields.insert(ID_FIELD.to_string(), Value::from(id));

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        let mut entry = self.collections.entry_async(collection.to_string()).await.or_default();
        entry.get_mut().insert(id, document);
        Ok(())
    }

    async fn update_many(
        &self,
        collection: &str,
        query: &Query,
        update: &Update,
    ) -> Result<UpdateResult, StoreError> {
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        let mut result = UpdateResult::default();

        match self.collections.entry_async(collection.to_string()).await {
            scc::hash_map::Entry::Occupied(mut o) => {
                for doc in o.get_mut().values_mut().filter(|doc| query.matches(doc)) {
                    result.matched += 1;
                    // Apply on a copy so a failing operator leaves the document untouched
                    let mut updated = doc.clone();
                    if update.apply(&mut updated)? {
                        *doc = updated;
                        result.modified += 1;
                    }
                }
            }
            scc::hash_map::Entry::Vacant(_) => {}
        }

        Ok(result)
    }

    async fn delete_one(&self, collection: &str, query: &Query) -> Result<DeleteResult, StoreError> {
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        let mut result = DeleteResult::default();

        if let scc::hash_map::Entry::Occupied(mut o) =
            self.collections.entry_async(collection.to_string()).await
        {
            let docs = o.get_mut();
            let first = docs.iter().find(|(_, doc)| query.matches(doc)).map(|(id, _)| *id);
            if let Some(id) = first {
                docs.remove(&id);
                result.deleted = 1;
            }
        }

        Ok(result)
    }

    async fn delete_many(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<DeleteResult, StoreError> {
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        let mut result = DeleteResult::default();

        if let scc::hash_map::Entry::Occupied(mut o) =
            self.collections.entry_async(collection.to_string()).await
        {
            let docs = o.get_mut();
            let before = docs.len();
            docs.retain(|_, doc| !query.matches(doc));
            result.deleted = (before - docs.len()) as u64;
        }

        Ok(result)
    }
}
