use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use keyring::Entry;

use super::KeyValueStore;

const SERVICE_NAME: &str = "shopkeep";

/// Keeps each key as its own entry in the OS keychain.
pub struct KeyringStore {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Entry handle for `key`, created on first use.
    fn entry(&self, key: &str) -> Result<Arc<Entry>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("keychain entry cache poisoned"))?;
        if let Some(entry) = entries.get(key) {
            return Ok(entry.clone());
        }
        let entry = Arc::new(Entry::new(&self.service, key).context("Failed to create keyring entry")?);
        entries.insert(key.to_string(), entry.clone());
        Ok(entry)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve value from keychain"),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete value from keychain"),
        }
    }
}
