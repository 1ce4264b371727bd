//! Document store abstraction
//!
//! The cascade engine never talks to a concrete database. It issues finds and
//! the three update operators of [`Update`] through the [`DocumentStore`]
//! trait, so any backend that can express them can host cascades.

pub mod memory;
pub mod query;

pub use memory::{MemoryStore, MemoryStoreStats};
pub use query::{Query, Update};

use async_trait::async_trait;
use serde_json::Value;

use crate::document::DocumentId;
use crate::error::StoreError;

/// Outcome of an `update_many` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// Outcome of a delete call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted: u64,
}

/// Operations the collection wrapper and the cascade engine consume
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of `collection` matching `query`
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Insert the document under `id`, replacing any previous version
    async fn insert_or_replace(
        &self,
        collection: &str,
        id: DocumentId,
        document: Value,
    ) -> Result<(), StoreError>;

    async fn update_many(
        &self,
        collection: &str,
        query: &Query,
        update: &Update,
    ) -> Result<UpdateResult, StoreError>;

    async fn delete_one(&self, collection: &str, query: &Query) -> Result<DeleteResult, StoreError>;

    async fn delete_many(&self, collection: &str, query: &Query)
        -> Result<DeleteResult, StoreError>;
}
