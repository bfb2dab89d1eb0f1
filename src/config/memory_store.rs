use super::{ConfigStore, ConfigValues, StorageError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory [`ConfigStore`].
///
/// [`set_available(false)`](Self::set_available) makes every call fail with
/// [`StorageError::Unavailable`].
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: Mutex<ConfigValues>,
    unavailable: AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: ConfigValues) -> Self {
        Self {
            values: Mutex::new(values),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> ConfigValues {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self, keys: &[&str]) -> Result<ConfigValues, StorageError> {
        self.check_available()?;
        let values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn save(&self, values: ConfigValues) -> Result<(), StorageError> {
        self.check_available()?;
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(values);
        Ok(())
    }
}
