//! Key-value persistence used by the credential store.
//!
//! The auth core only needs four string operations, so every backend sits
//! behind [`KeyValueStore`]:
//! - `MemoryStore`: process-local map, used in tests and ephemeral runs
//! - `FileStore`: JSON file on disk, survives restarts
//! - `KeyringStore`: one OS keychain entry per key

pub mod file;
pub mod keychain;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

/// Async string key-value storage. Last write wins per key; there is no
/// transaction spanning several keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Attempts every key even when some removals fail, then reports the
    /// first failure.
    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key).await {
                first_error.get_or_insert(e.context(format!("Failed to remove {}", key)));
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
