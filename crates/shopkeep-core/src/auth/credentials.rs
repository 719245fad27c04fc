use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::models::{TokenBundle, User};
use crate::storage::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "@access_token";
pub const REFRESH_TOKEN_KEY: &str = "@refresh_token";
pub const TOKEN_EXPIRES_AT_KEY: &str = "@token_expires_at";
pub const REFRESH_EXPIRES_AT_KEY: &str = "@refresh_token_expires_at";
pub const USER_DATA_KEY: &str = "@user_data";
pub const LAST_LOGIN_KEY: &str = "@last_login";

/// Every key the credential store owns. They are written and cleared together.
pub const ALL_KEYS: [&str; 6] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    TOKEN_EXPIRES_AT_KEY,
    REFRESH_EXPIRES_AT_KEY,
    USER_DATA_KEY,
    LAST_LOGIN_KEY,
];

/// Whatever was found in storage. A field is `None` when its key is absent
/// or its value could not be parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token_expires_at: Option<i64>,
    pub refresh_token_expires_at: Option<i64>,
    pub user: Option<User>,
    pub last_login: Option<DateTime<Utc>>,
    /// How many of the keys existed in storage, parseable or not.
    pub present_keys: usize,
}

impl StoredCredentials {
    pub fn tokens(&self) -> Option<TokenBundle> {
        Some(TokenBundle {
            access_token: self.access_token.clone()?,
            refresh_token: self.refresh_token.clone()?,
            access_token_expires_at: self.access_token_expires_at?,
            refresh_token_expires_at: self.refresh_token_expires_at?,
        })
    }

    /// True only when the token bundle, user snapshot and login time are all present.
    pub fn is_complete(&self) -> bool {
        self.tokens().is_some() && self.user.is_some() && self.last_login.is_some()
    }

    /// True when none of the keys exist. Unparseable leftovers still count
    /// as present so they get purged.
    pub fn is_empty(&self) -> bool {
        self.present_keys == 0
    }
}

/// Durable home of the token bundle, user snapshot and login timestamp.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a full session. On a storage failure the partial write is
    /// purged before the error is returned.
    pub async fn save(&self, tokens: &TokenBundle, user: &User, login_at: DateTime<Utc>) -> Result<()> {
        let user_json = serde_json::to_string(user).context("Failed to serialize user snapshot")?;
        let last_login = login_at.to_rfc3339_opts(SecondsFormat::Millis, true);

        let access_expiry = tokens.access_token_expires_at.to_string();
        let refresh_expiry = tokens.refresh_token_expires_at.to_string();
        let written = futures::try_join!(
            self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token),
            self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token),
            self.store.set(TOKEN_EXPIRES_AT_KEY, &access_expiry),
            self.store.set(REFRESH_EXPIRES_AT_KEY, &refresh_expiry),
            self.store.set(USER_DATA_KEY, &user_json),
            self.store.set(LAST_LOGIN_KEY, &last_login),
        );

        if let Err(e) = written {
            warn!(error = %e, "Failed to persist session, discarding partial write");
            self.clear().await;
            return Err(e.context("Failed to persist session"));
        }
        debug!(user = %user.email, "Session persisted");
        Ok(())
    }

    /// Replace the token keys after a refresh. The user snapshot and login
    /// time are left alone.
    pub async fn save_tokens(&self, tokens: &TokenBundle) -> Result<()> {
        let access_expiry = tokens.access_token_expires_at.to_string();
        let refresh_expiry = tokens.refresh_token_expires_at.to_string();
        futures::try_join!(
            self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token),
            self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token),
            self.store.set(TOKEN_EXPIRES_AT_KEY, &access_expiry),
            self.store.set(REFRESH_EXPIRES_AT_KEY, &refresh_expiry),
        )
        .context("Failed to persist refreshed tokens")?;
        Ok(())
    }

    /// Read every key concurrently. Never fails; unreadable keys come back as `None`.
    pub async fn load(&self) -> StoredCredentials {
        let (access_token, refresh_token, access_expiry, refresh_expiry, user, last_login) = futures::join!(
            self.read(ACCESS_TOKEN_KEY),
            self.read(REFRESH_TOKEN_KEY),
            self.read(TOKEN_EXPIRES_AT_KEY),
            self.read(REFRESH_EXPIRES_AT_KEY),
            self.read(USER_DATA_KEY),
            self.read(LAST_LOGIN_KEY),
        );

        let present_keys = [
            &access_token,
            &refresh_token,
            &access_expiry,
            &refresh_expiry,
            &user,
            &last_login,
        ]
        .iter()
        .filter(|value| value.is_some())
        .count();

        StoredCredentials {
            access_token,
            refresh_token,
            access_token_expires_at: access_expiry.and_then(|v| parse_millis(TOKEN_EXPIRES_AT_KEY, &v)),
            refresh_token_expires_at: refresh_expiry
                .and_then(|v| parse_millis(REFRESH_EXPIRES_AT_KEY, &v)),
            user: user.and_then(|v| parse_user(&v)),
            last_login: last_login.and_then(|v| parse_timestamp(&v)),
            present_keys,
        }
    }

    /// Remove every key. Idempotent, and errors are only logged: this runs
    /// on failure paths where the store may already be half gone.
    pub async fn clear(&self) {
        match self.store.remove_many(&ALL_KEYS).await {
            Ok(()) => debug!("All auth data cleared"),
            Err(e) => warn!(error = %e, "Failed to clear auth data"),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    pub async fn access_token_expires_at(&self) -> Option<i64> {
        let raw = self.read(TOKEN_EXPIRES_AT_KEY).await?;
        parse_millis(TOKEN_EXPIRES_AT_KEY, &raw)
    }

    pub async fn user(&self) -> Option<User> {
        let raw = self.read(USER_DATA_KEY).await?;
        parse_user(&raw)
    }

    pub async fn last_login(&self) -> Option<DateTime<Utc>> {
        let raw = self.read(LAST_LOGIN_KEY).await?;
        parse_timestamp(&raw)
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential key");
                None
            }
        }
    }
}

fn parse_millis(key: &str, raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(ms) => Some(ms),
        Err(e) => {
            warn!(key, error = %e, "Stored expiry is not a number");
            None
        }
    }
}

fn parse_user(raw: &str) -> Option<User> {
    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "Stored user snapshot is corrupt");
            None
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!(error = %e, "Stored login timestamp is invalid");
            None
        }
    }
}
