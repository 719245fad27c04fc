use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{AuthApi, AuthError, ADMIN_ONLY_MESSAGE};
use crate::models::{LoginRequest, User};
use crate::storage::KeyValueStore;

use super::credentials::StoredCredentials;
use super::{validation, CredentialStore, TokenRefresher};

/// Absolute session lifetime, counted from login and unaffected by token refreshes.
pub const SESSION_MAX_AGE_HOURS: i64 = 24;

/// How often the application shell should call `check_session_validity`.
pub const SESSION_CHECK_INTERVAL: StdDuration = StdDuration::from_secs(30);

/// What the UI observes about the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl SessionState {
    /// State at process start, before stored credentials are read.
    pub fn loading() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: false,
        }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::loading()
    }
}

/// True once more than 24 hours have passed since `last_login`.
pub fn is_session_expired(last_login: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_login > Duration::hours(SESSION_MAX_AGE_HOURS)
}

/// Owns the authenticated state and enforces the admin-only, 24-hour
/// session policy.
///
/// Share it behind an `Arc`: the periodic validity check and every command
/// handler hold the same instance.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    credentials: CredentialStore,
    tokens: TokenRefresher,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, api: Arc<dyn AuthApi>) -> Self {
        let credentials = CredentialStore::new(store);
        let tokens = TokenRefresher::new(credentials.clone(), api.clone());
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            api,
            credentials,
            tokens,
            state,
        }
    }

    /// Token source for outbound API calls.
    pub fn tokens(&self) -> &TokenRefresher {
        &self.tokens
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    fn publish(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    /// Restore the session persisted by a previous run. Called once at startup;
    /// always leaves `is_loading` false.
    pub async fn load_user_data(&self) {
        let stored = self.credentials.load().await;
        let next = self.restore(stored, Utc::now()).await;
        self.publish(next);
    }

    async fn restore(&self, stored: StoredCredentials, now: DateTime<Utc>) -> SessionState {
        if stored.is_empty() {
            debug!("No stored session");
            return SessionState::signed_out();
        }

        let complete = stored.is_complete();
        let (Some(user), Some(last_login), true) = (stored.user, stored.last_login, complete) else {
            warn!("Stored session is incomplete, discarding it");
            self.tokens.clear().await;
            return SessionState::signed_out();
        };

        if is_session_expired(last_login, now) {
            info!(%last_login, "Session older than {}h, login required", SESSION_MAX_AGE_HOURS);
            self.tokens.clear().await;
            return SessionState::signed_out();
        }

        if !user.is_admin() {
            warn!(email = %user.email, role = ?user.role, "Stored user is not an administrator, session cleared");
            self.tokens.clear().await;
            return SessionState::signed_out();
        }

        info!(email = %user.email, "Session restored");
        SessionState::signed_in(user)
    }

    /// Sign in. Only administrators get a session; anyone else is refused
    /// with `AuthError::AccessDenied` and nothing is stored.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        validation::validate_login(email, password)?;

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&request).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;

        if !response.user.is_admin() {
            warn!(email = %response.user.email, role = ?response.user.role, "Login refused: not an administrator");
            return Err(AuthError::AccessDenied(ADMIN_ONLY_MESSAGE.to_string()));
        }

        let now = Utc::now();
        let tokens = response.token_bundle(now.timestamp_millis());
        self.tokens.store_session(&tokens, &response.user, now).await?;

        self.publish(SessionState::signed_in(response.user.clone()));
        info!(email = %response.user.email, login_at = %now, "Login successful");
        Ok(response.user)
    }

    /// Drop the session. Never fails.
    pub async fn logout(&self) {
        self.tokens.clear().await;
        self.publish(SessionState::signed_out());
        info!("Logged out");
    }

    /// Periodic reconciliation with storage. Logs out when the stored
    /// session vanished underneath us (a failed refresh purges it without
    /// telling us) or when it has outlived the 24-hour window.
    pub async fn check_session_validity(&self) {
        if !self.is_authenticated() {
            return;
        }

        if self.credentials.user().await.is_none() {
            info!("Session expired - logging out");
            self.logout().await;
            return;
        }

        match self.credentials.last_login().await {
            Some(last_login) if !is_session_expired(last_login, Utc::now()) => {}
            Some(last_login) => {
                info!(%last_login, "Session reached its {}h limit - logging out", SESSION_MAX_AGE_HOURS);
                self.logout().await;
            }
            None => {
                warn!("Login timestamp missing - logging out");
                self.logout().await;
            }
        }
    }

    /// Log out an authenticated non-admin. Returns true when it did.
    pub async fn enforce_admin(&self) -> bool {
        let offending = {
            let state = self.state.borrow();
            state.is_authenticated && !state.user.as_ref().is_some_and(User::is_admin)
        };
        if offending {
            warn!("Authenticated user is not an administrator, logging out");
            self.logout().await;
        }
        offending
    }

    /// Ask the backend to send a password reset email. Backend failures
    /// are logged, not returned; only a malformed address is an error.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        if let Some(message) = validation::email_error(email) {
            return Err(AuthError::Validation(message.to_string()));
        }
        if let Err(e) = self.api.forgot_password(email.trim()).await {
            warn!(error = %e, "Password recovery request failed");
        }
        Ok(())
    }

    /// Run `check_session_validity` every `period` until the handle is aborted.
    pub fn spawn_validity_check(self: Arc<Self>, period: StdDuration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.check_session_validity().await;
            }
        })
    }
}
