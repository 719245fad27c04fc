//! Session and token lifecycle core for the shopkeep admin client.
//!
//! The crate keeps an administrator signed in against the shop backend:
//! it persists the token bundle, renews the access token before it lapses,
//! enforces the admin-only rule and the 24-hour session window, and tells
//! the rest of the application when the session ends.
//!
//! ```no_run
//! use std::sync::Arc;
//! use shopkeep_core::{ApiClient, Config, SessionManager};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let api = Arc::new(ApiClient::new(config.effective_api_url())?);
//! let session = Arc::new(SessionManager::new(config.open_store()?, api.clone()));
//! session.load_user_data().await;
//! let _check = session.clone().spawn_validity_check(config.session_check_interval());
//!
//! if let Some(token) = session.tokens().get_valid_access_token().await {
//!     let users: serde_json::Value = api.get_authorized("/users", &token).await?;
//!     println!("{}", users);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, AuthApi, AuthError, ErrorKind};
pub use auth::{
    guard, CredentialStore, GuardDecision, Route, SessionManager, SessionState, TokenRefresher,
};
pub use config::{Config, StorageBackend};
pub use models::{TokenBundle, User, UserRole};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
