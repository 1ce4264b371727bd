//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//! ```

// === Documents ===
pub use crate::document::{Capabilities, Capability, Document, DocumentBase, DocumentId, ID_FIELD};
pub use crate::document_base_methods;
// Trait, plus the derive when the `macros` feature is on
pub use crate::Inspectable;
pub use crate::tracker::{DiffTracker, Tracked};

// === Cascades ===
pub use crate::cascade::{
    CascadeConfig, CascadeFailure, CascadeHandle, CascadeOperation, DeletePolicy, RelType,
};

// === Persistence ===
pub use crate::collection::Collection;
pub use crate::database::Database;
pub use crate::store::{DocumentStore, MemoryStore, Query, Update};

// === Configuration and errors ===
pub use crate::config::StrataConfig;
pub use crate::error::{StrataError, StrataResult};
