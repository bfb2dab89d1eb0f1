//! Configuration storage.
//!
//! The filter reads and writes settings through the [`ConfigStore`] trait.
//! Values are raw YAML values keyed by their camelCase storage names (see
//! [`crate::models::settings::keys`]); decoding into typed settings happens
//! in [`FilterSettings::from_values`](crate::models::FilterSettings::from_values).
//!
//! - [`YamlConfigStore`]: one YAML file on disk
//! - [`MemoryConfigStore`]: in-process map, mainly for tests and embedding

mod memory_store;
mod yaml_store;

pub use memory_store::MemoryConfigStore;
pub use yaml_store::{CONFIG_FILE_NAME, YamlConfigStore};

use async_trait::async_trait;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde_yaml_ng::Value;
use thiserror::Error;

/// Raw stored values keyed by storage name.
pub type ConfigValues = IndexMap<String, Value>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Configuration store is unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),

    #[error("Configuration store rejected the write: {0}")]
    Rejected(String),
}

/// Async key/value settings backend.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the requested keys. Keys with no stored value are left out.
    async fn load(&self, keys: &[&str]) -> Result<ConfigValues, StorageError>;

    /// Store the given keys, leaving all other stored keys untouched.
    async fn save(&self, values: ConfigValues) -> Result<(), StorageError>;
}
