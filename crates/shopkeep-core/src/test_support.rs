//! Fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;

use crate::api::{AuthApi, AuthError};
use crate::models::{LoginRequest, LoginResponse, TokenBundle, TokenResponse, User, UserRole};
use crate::storage::{KeyValueStore, MemoryStore};

pub(crate) fn sample_user(role: UserRole) -> User {
    User {
        id: 1,
        email: "admin@x.com".to_string(),
        username: "admin".to_string(),
        role,
        first_name: Some("Ada".to_string()),
        last_name: None,
        status: "active".to_string(),
        is_active: true,
        address: None,
        avatar: None,
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn sample_tokens(access_expires_at: i64) -> TokenBundle {
    TokenBundle {
        access_token: "access-0".to_string(),
        refresh_token: "refresh-0".to_string(),
        access_token_expires_at: access_expires_at,
        refresh_token_expires_at: access_expires_at + 86_400_000,
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RefreshOutcome {
    Succeed,
    Fail(u16),
}

/// Scripted backend that counts calls.
pub(crate) struct FakeApi {
    role: UserRole,
    reject_login: bool,
    refresh_outcome: Mutex<RefreshOutcome>,
    refresh_delay: Duration,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub forgot_calls: AtomicUsize,
}

impl FakeApi {
    pub fn with_role(role: UserRole) -> Self {
        Self {
            role,
            reject_login: false,
            refresh_outcome: Mutex::new(RefreshOutcome::Succeed),
            refresh_delay: Duration::ZERO,
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            forgot_calls: AtomicUsize::new(0),
        }
    }

    pub fn admin() -> Self {
        Self::with_role(UserRole::Admin)
    }

    pub fn rejecting_login() -> Self {
        Self {
            reject_login: true,
            ..Self::admin()
        }
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn set_refresh_outcome(&self, outcome: RefreshOutcome) {
        *self.refresh_outcome.lock().unwrap() = outcome;
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for FakeApi {
    async fn login(&self, _credentials: &LoginRequest) -> Result<LoginResponse, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_login {
            return Err(AuthError::from_status(
                StatusCode::UNAUTHORIZED,
                r#"{"message":"Invalid credentials"}"#,
            ));
        }
        let now = now_ms();
        Ok(LoginResponse {
            user: sample_user(self.role),
            access_token: "access-login".to_string(),
            refresh_token: "refresh-login".to_string(),
            expires_in: Some(900),
            token_type: Some("Bearer".to_string()),
            access_token_expires_at: Some(now + 900_000),
            refresh_token_expires_at: Some(now + 86_400_000),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        let outcome = *self.refresh_outcome.lock().unwrap();
        match outcome {
            RefreshOutcome::Succeed => {
                let now = now_ms();
                Ok(TokenResponse {
                    access_token: format!("access-r{}", n),
                    refresh_token: format!("refresh-r{}", n),
                    expires_in: Some(900),
                    access_token_expires_at: Some(now + 900_000),
                    refresh_token_expires_at: Some(now + 86_400_000),
                })
            }
            RefreshOutcome::Fail(code) => Err(AuthError::from_status(
                StatusCode::from_u16(code).unwrap(),
                r#"{"message":"Refresh token expired"}"#,
            )),
        }
    }

    async fn forgot_password(&self, _email: &str) -> Result<(), AuthError> {
        self.forgot_calls.fetch_add(1, Ordering::SeqCst);
        Err(AuthError::ServerError("mailer offline".to_string()))
    }
}

/// A storage medium where every operation fails.
pub(crate) struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("storage unavailable"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("storage unavailable"))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(anyhow!("storage unavailable"))
    }
}

/// In-memory store whose `remove` always fails for one key.
pub(crate) struct StuckKeyStore {
    pub inner: MemoryStore,
    stuck: &'static str,
}

impl StuckKeyStore {
    pub fn new(stuck: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            stuck,
        }
    }
}

#[async_trait]
impl KeyValueStore for StuckKeyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if key == self.stuck {
            return Err(anyhow!("keychain item locked"));
        }
        self.inner.remove(key).await
    }
}
