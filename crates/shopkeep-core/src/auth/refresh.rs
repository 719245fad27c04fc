use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::models::{TokenBundle, User};

use super::CredentialStore;

/// Renew the access token once it is within this many milliseconds of expiry (2 minutes).
pub const RENEW_MARGIN_MS: i64 = 120_000;

/// True when an access token expiring at `expires_at` should be renewed at
/// `now_ms`. An unknown expiry always needs renewal.
pub fn needs_renewal(expires_at: Option<i64>, now_ms: i64) -> bool {
    match expires_at {
        Some(expires_at) => now_ms >= expires_at.saturating_sub(RENEW_MARGIN_MS),
        None => true,
    }
}

/// Hands out live access tokens, renewing them against `/auth/refresh`.
///
/// A failed renewal is final: all auth data is purged and callers get
/// `None`, which means the session is over. Renewals are serialized so
/// concurrent callers never spend the same refresh token twice.
pub struct TokenRefresher {
    credentials: CredentialStore,
    api: Arc<dyn AuthApi>,
    refresh_lock: Mutex<()>,
}

impl TokenRefresher {
    pub fn new(credentials: CredentialStore, api: Arc<dyn AuthApi>) -> Self {
        Self {
            credentials,
            api,
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn is_expiring_soon(&self) -> bool {
        let expires_at = self.credentials.access_token_expires_at().await;
        needs_renewal(expires_at, Utc::now().timestamp_millis())
    }

    /// Force a renewal. Returns the new access token, or `None` after
    /// purging the store.
    pub async fn refresh(&self) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// The bearer token every outbound API call should use.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        if !self.is_expiring_soon().await {
            return self.credentials.access_token().await;
        }

        debug!("Access token expiring soon");
        let _guard = self.refresh_lock.lock().await;

        // Whoever held the lock before us may already have renewed.
        if !self.is_expiring_soon().await {
            debug!("Token renewed by a concurrent caller");
            return self.credentials.access_token().await;
        }
        self.refresh_locked().await
    }

    /// Persist a new session. Waits out any renewal in flight so it cannot
    /// overwrite the fresh tokens with ones from the previous session.
    pub async fn store_session(
        &self,
        tokens: &TokenBundle,
        user: &User,
        login_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.credentials.save(tokens, user, login_at).await
    }

    /// Purge all auth data. Waits out any renewal in flight so it cannot
    /// write tokens back afterwards.
    pub async fn clear(&self) {
        let _guard = self.refresh_lock.lock().await;
        self.credentials.clear().await;
    }

    async fn refresh_locked(&self) -> Option<String> {
        let Some(refresh_token) = self.credentials.refresh_token().await else {
            info!("No refresh token available");
            self.credentials.clear().await;
            return None;
        };

        info!("Refreshing access token");
        let response = match self.api.refresh(&refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Token refresh failed, ending session");
                self.credentials.clear().await;
                return None;
            }
        };

        let tokens = response.into_bundle(Utc::now().timestamp_millis());
        if let Err(e) = self.credentials.save_tokens(&tokens).await {
            warn!(error = %e, "Could not store refreshed tokens, ending session");
            self.credentials.clear().await;
            return None;
        }

        info!("Access token refreshed");
        Some(tokens.access_token)
    }
}
