use serde::{Deserialize, Serialize};

use super::User;

/// Access-token lifetime assumed when the backend omits `expires_in` (15 minutes).
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 900;

/// Refresh-token lifetime assumed when the backend omits its expiry (24 hours).
pub const DEFAULT_REFRESH_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Tokens as persisted in the credential store.
///
/// Expiry timestamps are absolute epoch milliseconds. The access token and its
/// expiry are always written together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: i64,
    pub refresh_token_expires_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub access_token_expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token_expires_at: Option<i64>,
}

impl LoginResponse {
    /// Build the token bundle to persist, filling in missing expiries
    /// relative to `now_ms`.
    pub fn token_bundle(&self, now_ms: i64) -> TokenBundle {
        TokenBundle {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            access_token_expires_at: self
                .access_token_expires_at
                .unwrap_or(now_ms + DEFAULT_EXPIRES_IN_SECS * 1000),
            refresh_token_expires_at: self
                .refresh_token_expires_at
                .unwrap_or(now_ms + DEFAULT_REFRESH_TTL_MS),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub access_token_expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token_expires_at: Option<i64>,
}

impl TokenResponse {
    /// Convert a refresh response into a bundle. A missing absolute expiry is
    /// derived from `expires_in` (or the 15 minute default).
    pub fn into_bundle(self, now_ms: i64) -> TokenBundle {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        TokenBundle {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            access_token_expires_at: self
                .access_token_expires_at
                .unwrap_or(now_ms + expires_in * 1000),
            refresh_token_expires_at: self
                .refresh_token_expires_at
                .unwrap_or(now_ms + DEFAULT_REFRESH_TTL_MS),
        }
    }
}
