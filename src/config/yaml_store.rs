use super::{ConfigStore, ConfigValues, StorageError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml_ng::Value;
use std::fs;
use tokio::sync::Mutex;

/// File name of the settings file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "ytlens.yaml";

/// Settings stored as a single YAML mapping (`ytlens.yaml`).
///
/// A missing file reads as an empty store. Saves merge into the existing
/// mapping and keep key order.
#[derive(Debug)]
pub struct YamlConfigStore {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    write_lock: Mutex<()>,
}

impl YamlConfigStore {
    /// Create a store rooted at `config_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    async fn read_all(&self) -> Result<ConfigValues, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.config_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Config file not found at {}, using defaults", self.config_path);
                return Ok(ConfigValues::new());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.config_path.clone(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(ConfigValues::new());
        }

        let parsed: Value =
            serde_yaml_ng::from_str(&contents).map_err(|source| StorageError::Parse {
                path: self.config_path.clone(),
                source,
            })?;

        match parsed {
            Value::Mapping(mapping) => Ok(mapping
                .into_iter()
                .filter_map(|(key, value)| match key {
                    Value::String(key) => Some((key, value)),
                    other => {
                        tracing::warn!("Ignoring non-string config key: {:?}", other);
                        None
                    }
                })
                .collect()),
            Value::Null => Ok(ConfigValues::new()),
            _ => Err(StorageError::Rejected(format!(
                "{} does not contain a mapping",
                self.config_path
            ))),
        }
    }
}

#[async_trait]
impl ConfigStore for YamlConfigStore {
    async fn load(&self, keys: &[&str]) -> Result<ConfigValues, StorageError> {
        let mut all = self.read_all().await?;
        let values: ConfigValues = keys
            .iter()
            .filter_map(|key| all.shift_remove_entry(*key))
            .collect();

        tracing::info!(
            "Loaded {} of {} config keys from {}",
            values.len(),
            keys.len(),
            self.config_path
        );
        Ok(values)
    }

    async fn save(&self, values: ConfigValues) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut merged = self.read_all().await?;
        let count = values.len();
        merged.extend(values);

        let yaml_string = serde_yaml_ng::to_string(&merged)?;
        tokio::fs::write(&self.config_path, yaml_string)
            .await
            .map_err(|source| StorageError::Io {
                path: self.config_path.clone(),
                source,
            })?;

        tracing::info!("Saved {} config keys to {}", count, self.config_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (YamlConfigStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let store = YamlConfigStore::new(&config_path).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let (store, _temp_dir) = create_test_store();
        let values = store.load(&["dryrun"]).await.unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_save_merges_keys() {
        let (store, _temp_dir) = create_test_store();

        let mut first = ConfigValues::new();
        first.insert("dryrun".into(), Value::Bool(false));
        first.insert("useWhitelist".into(), Value::Bool(true));
        store.save(first).await.unwrap();

        let mut second = ConfigValues::new();
        second.insert("dryrun".into(), Value::Bool(true));
        store.save(second).await.unwrap();

        let values = store.load(&["dryrun", "useWhitelist"]).await.unwrap();
        assert_eq!(values.get("dryrun"), Some(&Value::Bool(true)));
        assert_eq!(values.get("useWhitelist"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_non_mapping_rejected() {
        let (store, _temp_dir) = create_test_store();
        fs::write(store.config_path(), "- just\n- a list\n").unwrap();

        let err = store.load(&["dryrun"]).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
    }
}
