//! Database handle tying a document store to the cascade queue.

use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::cascade::{CascadeFailure, CascadeQueue};
use crate::collection::Collection;
use crate::config::{CascadeSettings, StrataConfig};
use crate::error::{StrataError, StrataResult};
use crate::store::DocumentStore;

struct DatabaseInner {
    name: String,
    store: Arc<dyn DocumentStore>,
    settings: CascadeSettings,
    queue: CascadeQueue,
}

/// Shared handle to a store plus its background cascade workers
///
/// Cloning is cheap; every clone talks to the same workers. Must be created
/// inside a Tokio runtime.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Validate `config` and start the cascade workers it describes
    pub fn new(store: Arc<dyn DocumentStore>, config: &StrataConfig) -> StrataResult<Self> {
        config.validate().map_err(|e| StrataError::Config(format!("{:#}", e)))?;

        let settings = config.cascade.clone();
        let queue = CascadeQueue::new(settings.workers);
        log::info!(
            "database '{}' ready ({} cascade worker(s), max nest depth {}, delete policy {})",
            config.store.database,
            settings.workers,
            settings.max_nest_depth,
            settings.delete_policy
        );

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                name: config.store.database.clone(),
                store,
                settings,
                queue,
            }),
        })
    }

    /// Database over `store` with default settings
    pub fn with_store(store: impl DocumentStore + 'static) -> Self {
        let config = StrataConfig::default();
        let settings = config.cascade;
        Self {
            inner: Arc::new(DatabaseInner {
                name: config.store.database,
                store: Arc::new(store),
                queue: CascadeQueue::new(settings.workers),
                settings,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(name, self.clone())
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    pub fn settings(&self) -> &CascadeSettings {
        &self.inner.settings
    }

    pub(crate) fn queue(&self) -> &CascadeQueue {
        &self.inner.queue
    }

    /// Receive every background cascade failure from now on
    pub fn subscribe_failures(&self) -> broadcast::Receiver<CascadeFailure> {
        self.inner.queue.subscribe_failures()
    }

    /// Finish queued cascades and stop the workers
    pub async fn shutdown(&self) {
        self.inner.queue.shutdown().await;
        log::info!("database '{}' cascade queue stopped", self.inner.name);
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name)
            .field("settings", &self.inner.settings)
            .field("queue", &self.inner.queue)
            .finish()
    }
}
