use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::KeyValueStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(f(&mut entries))
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.with_entries(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.with_entries(|e| e.contains_key(key)).unwrap_or(false)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|e| e.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|e| {
            e.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|e| {
            e.remove(key);
        })
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        self.with_entries(|e| {
            for key in keys {
                e.remove(*key);
            }
        })
    }
}
