//! Configuration system for Strata
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment Variables** (`STRATA_*`)
//! 2. **Config File** (`strata.toml`)
//! 3. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use strata_core::config::StrataConfig;
//!
//! let config = StrataConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ```toml
//! [cascade]
//! workers = 4
//! max_nest_depth = 8
//! delete_policy = "best_effort"
//!
//! [store]
//! database = "strata"
//!
//! [logging]
//! level = "info"
//! format = "human"
//! ```

pub mod cascade;
pub mod logging;
pub mod store;

pub use cascade::CascadeSettings;
pub use logging::{LogFormat, LoggingConfig};
pub use store::StoreConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete Strata configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    pub cascade: CascadeSettings,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl StrataConfig {
    /// Load configuration with full supersedence chain from `strata.toml`
    pub fn load() -> Result<Self> {
        Self::load_from("strata.toml")
    }

    /// Defaults, then `path` if it exists, then environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.cascade.merge(other.cascade);
        self.store.merge(other.store);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.cascade.apply_env_vars();
        self.store.apply_env_vars();
        self.logging.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.cascade.validate()?;
        self.store.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
