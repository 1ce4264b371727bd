//! Collection handle: typed persistence with hook dispatch and cascades.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::cascade::queue::CascadeJob;
use crate::cascade::{CascadeHandle, CascadePlan};
use crate::database::Database;
use crate::document::{Capability, Document, DocumentId, ID_FIELD};
use crate::error::{StrataError, StrataResult};
use crate::store::{DeleteResult, DocumentStore, Query, Update, UpdateResult};
use crate::tracker::Tracked;

/// Named collection inside a [`Database`]. Cheap to clone.
#[derive(Clone)]
pub struct Collection {
    name: Arc<str>,
    db: Database,
}

impl Collection {
    pub(crate) fn new(name: &str, db: Database) -> Self {
        Self { name: Arc::from(name), db }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.db.store()
    }

    /// Validate, run the save hooks, upsert and schedule the cascade.
    ///
    /// The returned handle completes when the background cascade has run; it
    /// can be dropped. A document declared not-new without an identifier is
    /// rejected with `NotNewWithoutId`. A failing after-save hook is returned
    /// as an error, but the cascade of the committed write still runs.
    pub async fn save<D>(&self, doc: &mut D) -> StrataResult<CascadeHandle>
    where
        D: Document + Serialize,
    {
        self.pre_save(doc)?;

        let is_new = !doc.has(Capability::NewTrackable) || doc.is_new();
        let now = Utc::now();
        if is_new && doc.has(Capability::TimeCreated) {
            doc.set_created_at(now);
        }
        if doc.has(Capability::TimeModified) {
            doc.set_updated_at(now);
        }

        let id = match (doc.id(), is_new) {
            (Some(id), _) => id,
            (None, true) => {
                let id = DocumentId::new();
                doc.set_id(id);
                id
            }
            (None, false) => return Err(StrataError::NotNewWithoutId),
        };

        let value = serde_json::to_value(&*doc)?;
        self.store().insert_or_replace(&self.name, id, value).await?;
        log::debug!("saved {} in {}", id, self.name);

        // The write is committed: schedule the cascade before any hook can fail
        let handle = match CascadePlan::collect(self, &*doc) {
            Some(plan) => self.db.queue().submit(CascadeJob::save(plan)),
            None => CascadeHandle::none(),
        };
        if doc.has(Capability::NewTrackable) {
            doc.set_is_new(false);
        }

        if doc.has(Capability::AfterSave) {
            if let Err(e) = doc.after_save(self) {
                log::warn!("after-save hook for {} in {} failed: {}", id, self.name, e);
                return Err(e.into());
            }
        }

        Ok(handle)
    }

    /// Save, wait for the cascade and take a new tracker baseline.
    ///
    /// The baseline is only reset when the cascade succeeded, so a failed run
    /// is retried with the same old-owner cleanup on the next save.
    pub async fn save_settled<D>(&self, doc: &mut D) -> StrataResult<()>
    where
        D: Document + Tracked + Serialize,
    {
        self.save(doc).await?.wait().await?;
        doc.reset_tracker();
        Ok(())
    }

    fn pre_save(&self, doc: &mut dyn Document) -> StrataResult<()> {
        if doc.has(Capability::Validatable) {
            let errors = doc.validate(self);
            if !errors.is_empty() {
                return Err(StrataError::ValidationFailed(errors));
            }
        }
        if doc.has(Capability::BeforeSave) {
            doc.before_save(self)?;
        }
        Ok(())
    }

    /// Every document matching `query`, with after-find hooks applied
    pub async fn find<D>(&self, query: &Query) -> StrataResult<Vec<D>>
    where
        D: Document + DeserializeOwned,
    {
        self.find_values(query).await?.into_iter().map(|value| self.materialize(value)).collect()
    }

    pub async fn find_one<D>(&self, query: &Query) -> StrataResult<D>
    where
        D: Document + DeserializeOwned,
    {
        let value = self
            .find_values(query)
            .await?
            .into_iter()
            .next()
            .ok_or(StrataError::DocumentNotFound)?;
        self.materialize(value)
    }

    pub async fn find_by_id<D>(&self, id: DocumentId) -> StrataResult<D>
    where
        D: Document + DeserializeOwned,
    {
        self.find_one(&Query::eq(ID_FIELD, id)).await
    }

    /// Raw documents matching `query`; no hooks run
    pub async fn find_values(&self, query: &Query) -> StrataResult<Vec<Value>> {
        Ok(self.store().find(&self.name, query).await?)
    }

    fn materialize<D>(&self, value: Value) -> StrataResult<D>
    where
        D: Document + DeserializeOwned,
    {
        let mut doc: D = serde_json::from_value(value)?;
        if doc.has(Capability::AfterFind) {
            doc.after_find(self)?;
        }
        if doc.has(Capability::NewTrackable) {
            doc.set_is_new(false);
        }
        Ok(doc)
    }

    pub async fn update_many(&self, query: &Query, update: &Update) -> StrataResult<UpdateResult> {
        let result = self.store().update_many(&self.name, query, update).await?;
        log::debug!(
            "update on {} matched {} and modified {} document(s)",
            self.name,
            result.matched,
            result.modified
        );
        Ok(result)
    }

    /// Delete a document, run its delete hooks and schedule the delete cascade
    pub async fn delete_document<D>(&self, doc: &mut D) -> StrataResult<(DeleteResult, CascadeHandle)>
    where
        D: Document,
    {
        if doc.has(Capability::BeforeDelete) {
            doc.before_delete(self)?;
        }

        let id = doc.id().ok_or_else(|| StrataError::MissingIdentifier { collection: self.name.to_string() })?;
        let result = self.store().delete_one(&self.name, &Query::eq(ID_FIELD, id)).await?;
        log::debug!("deleted {} from {}", id, self.name);

        let handle = match CascadePlan::collect(self, &*doc) {
            Some(plan) => {
                let policy = self.db.settings().delete_policy;
                self.db.queue().submit(CascadeJob::delete(plan, policy))
            }
            None => CascadeHandle::none(),
        };

        if doc.has(Capability::AfterDelete) {
            doc.after_delete(self)?;
        }

        Ok((result, handle))
    }

    /// Delete the first match. No hooks and no cascade.
    pub async fn delete_one(&self, query: &Query) -> StrataResult<DeleteResult> {
        Ok(self.store().delete_one(&self.name, query).await?)
    }

    /// Delete every match. No hooks and no cascade.
    pub async fn delete_many(&self, query: &Query) -> StrataResult<DeleteResult> {
        Ok(self.store().delete_many(&self.name, query).await?)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("database", &self.db.name())
            .finish()
    }
}
