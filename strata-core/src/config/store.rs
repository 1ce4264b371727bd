//! Store configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Logical database name, used in logs
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { database: "strata".to_string() }
    }
}

impl StoreConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(database) = env::var("STRATA_DATABASE") {
            self.database = database;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            bail!("store.database must not be empty");
        }
        Ok(())
    }
}
