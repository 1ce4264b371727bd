//! Cascade engine
//!
//! A cascading document describes, through [`Document::cascade`], which other
//! collections hold a denormalized copy of it. After the document is saved the
//! engine refreshes those copies, moving them when the association changed;
//! after it is deleted the copies are removed.
//!
//! Rules are collected synchronously into a [`CascadePlan`] at the call site,
//! so the background workers never read a document that the caller keeps
//! mutating.

pub mod config;
pub mod delete;
pub mod projector;
pub mod queue;
pub mod save;

pub use config::{CascadeConfig, DocumentFactory, ReferenceField, RelType};
pub use delete::{cascade_delete, cascade_delete_with_policy, DeletePolicy};
pub use projector::project;
pub use queue::{CascadeFailure, CascadeHandle, CascadeOperation, CascadeQueue};
pub use save::cascade_save;

use crate::collection::Collection;
use crate::document::{Capability, Document, DocumentId};
use crate::error::{StrataError, StrataResult};

/// The rules of one source document, detached from the document itself
#[derive(Debug, Clone)]
pub struct CascadePlan {
    pub(crate) collection: Collection,
    pub(crate) source_id: Option<DocumentId>,
    pub(crate) configs: Vec<CascadeConfig>,
}

impl CascadePlan {
    /// `None` when the document does not cascade
    pub fn collect(collection: &Collection, doc: &dyn Document) -> Option<Self> {
        if !doc.has(Capability::Cascading) {
            return None;
        }

        Some(Self {
            collection: collection.clone(),
            source_id: doc.id(),
            configs: doc.cascade(collection),
        })
    }

    pub fn configs(&self) -> &[CascadeConfig] {
        &self.configs
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Sources currently being cascaded, outermost first
#[derive(Debug)]
pub(crate) struct CascadePath {
    stack: Vec<(String, Option<DocumentId>)>,
    max_depth: usize,
}

impl CascadePath {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self { stack: Vec::new(), max_depth }
    }

    pub(crate) fn enter(&mut self, collection: &str, id: Option<DocumentId>) -> StrataResult<()> {
        if let Some(id) = id {
            let seen = self.stack.iter().any(|(c, i)| c == collection && *i == Some(id));
            if seen {
                return Err(StrataError::CyclicCascade { collection: collection.to_string(), id });
            }
        }
        if self.stack.len() >= self.max_depth {
            return Err(StrataError::NestDepthExceeded { max_depth: self.max_depth });
        }

        self.stack.push((collection.to_string(), id));
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }
}
