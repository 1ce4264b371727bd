//! Strata - Core
//!
//! Cascade engine for document stores that keep denormalized copies of a
//! document inside the documents referencing it.
//!
//! # Overview
//!
//! A child document embedded in its parent (`parent.child = {name, ...}`)
//! must be rewritten every time the child changes, moved when the child is
//! reassigned to another parent, and removed when the child is deleted.
//! Strata lets the child describe those embeds once, as a list of
//! [`CascadeConfig`] rules, and keeps them consistent in the background after
//! every save and delete.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Inspectable, Serialize, Deserialize, Default)]
//! struct Child {
//!     #[serde(flatten)]
//!     base: DocumentBase,
//!     parent_id: Option<DocumentId>,
//!     name: String,
//! }
//!
//! impl Document for Child {
//!     document_base_methods!(base);
//!
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::BASE.with(Capability::Cascading)
//!     }
//!
//!     fn cascade(&self, collection: &Collection) -> Vec<CascadeConfig> {
//!         let parents = collection.database().collection("parents");
//!         CascadeConfig::one(parents)
//!             .through("child")
//!             .matching(Query::eq("_id", self.parent_id))
//!             .properties(["_id", "name"])
//!             .project(self)
//!             .into_iter()
//!             .collect()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Database::with_store(MemoryStore::new());
//!     let mut child = Child { name: "c".into(), ..Default::default() };
//!     db.collection("children").save(&mut child).await?.wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`document`] - Document trait, capability set and the common [`DocumentBase`]
//! - [`inspect`] - Accessor tables for dotted-path field reads
//! - [`tracker`] - Per-instance change detection
//! - [`cascade`] - Rules, projector, save/delete orchestrators and the worker queue
//! - [`collection`] / [`database`] - Typed persistence with hook dispatch
//! - [`store`] - Store abstraction and the in-memory implementation

// Lets the derive macros refer to `strata_core::...` from inside this crate too
extern crate self as strata_core;

pub mod cascade;
pub mod collection;
pub mod config; // Configuration system with TOML support
pub mod database;
pub mod document;
pub mod error;
pub mod inspect;
pub mod logging; // env_logger backend setup for the `log` facade
pub mod store;
pub mod tracker;

// Prelude module for convenient imports
pub mod prelude;

// Used by generated code
pub use chrono;
pub use serde_json;

// Re-export derive macros from strata-macros so users only need one crate
#[cfg(feature = "macros")]
pub use strata_macros::Inspectable;

// Re-exports of main types and traits
pub use cascade::{CascadeConfig, CascadeFailure, CascadeHandle, DeletePolicy, RelType};
pub use collection::Collection;
pub use config::StrataConfig;
pub use database::Database;
pub use document::{Capabilities, Capability, Document, DocumentBase, DocumentId, ID_FIELD};
pub use error::{StoreError, StrataError, StrataResult};
pub use inspect::Inspectable;
pub use store::{DocumentStore, MemoryStore, Query, Update};
pub use tracker::{DiffTracker, Tracked};
