//! Cascade engine configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::cascade::DeletePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeSettings {
    /// Background workers draining the cascade queue
    pub workers: usize,
    /// Longest chain of nested cascades before the run is aborted
    pub max_nest_depth: usize,
    pub delete_policy: DeletePolicy,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self { workers: 4, max_nest_depth: 8, delete_policy: DeletePolicy::BestEffort }
    }
}

impl CascadeSettings {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(workers) = env::var("STRATA_CASCADE_WORKERS") {
            match workers.parse() {
                Ok(workers) => self.workers = workers,
                Err(_) => log::warn!("ignoring STRATA_CASCADE_WORKERS={}: not a number", workers),
            }
        }
        if let Ok(depth) = env::var("STRATA_MAX_NEST_DEPTH") {
            match depth.parse() {
                Ok(depth) => self.max_nest_depth = depth,
                Err(_) => log::warn!("ignoring STRATA_MAX_NEST_DEPTH={}: not a number", depth),
            }
        }
        if let Ok(policy) = env::var("STRATA_DELETE_POLICY") {
            match policy.parse() {
                Ok(policy) => self.delete_policy = policy,
                Err(e) => log::warn!("ignoring STRATA_DELETE_POLICY: {}", e),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("cascade.workers must be at least 1");
        }
        if self.max_nest_depth == 0 {
            bail!("cascade.max_nest_depth must be at least 1");
        }
        Ok(())
    }
}
