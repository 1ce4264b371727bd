//! Error types shared by the cascade engine, the collection wrapper and the store.

use crate::document::DocumentId;

/// Result alias used throughout the crate
pub type StrataResult<T> = Result<T, StrataError>;

/// Failures raised by a [`crate::store::DocumentStore`] while applying a query or update
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("field '{path}' is not an array")]
    NotAnArray { path: String },
    #[error("cannot descend into '{segment}' of '{path}': value is not an object")]
    PathConflict { path: String, segment: String },
    #[error("stored document in '{collection}' is not an object")]
    NotAnObject { collection: String },
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Main error type for Strata
#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    #[error("invalid relation type: {0}")]
    InvalidRelationType(String),
    #[error("cannot access non-object value via dot notation at '{path}'")]
    DotPathConflict { path: String },
    #[error("document in '{collection}' has no identifier to build a reference query from")]
    MissingIdentifier { collection: String },
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
    #[error("cyclic cascade: {collection}/{id} is already being cascaded")]
    CyclicCascade { collection: String, id: DocumentId },
    #[error("nested cascade exceeded the maximum depth of {max_depth}")]
    NestDepthExceeded { max_depth: usize },
    #[error("invalid cascade data: {0}")]
    InvalidCascadeData(String),
    #[error("cascade finished with {} failed config(s)", .failures.len())]
    Incomplete { failures: Vec<StrataError> },
    #[error("Validation failed. ({})", .0.join(", "))]
    ValidationFailed(Vec<String>),
    #[error("Document not found")]
    DocumentNotFound,
    #[error("document is marked as persisted but has no identifier")]
    NotNewWithoutId,
    #[error(transparent)]
    Hook(#[from] anyhow::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cascade queue is closed")]
    QueueClosed,
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl StrataError {
    /// True for errors produced while talking to the store
    pub fn is_store_error(&self) -> bool {
        matches!(self, StrataError::Store(_))
    }
}
