//! HTTP client for the admin backend.
//!
//! `ApiClient` implements [`AuthApi`], the three `/auth/*` calls the session
//! core depends on, and offers `get_authorized` for any other endpoint that
//! needs a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{LoginRequest, LoginResponse, RefreshRequest, TokenResponse};

use super::AuthError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Backend calls the session core needs.
///
/// Implemented by [`ApiClient`] for the real backend; tests substitute an
/// in-process fake.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, AuthError>;

    /// `POST /auth/refresh`
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;

    /// `POST /auth/forgot-password`
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;
}

/// API client for the admin backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::from_status(status, &body))
        }
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("Failed to parse {}: {}", url, e)))
    }

    /// GET an arbitrary backend path with the given bearer token.
    ///
    /// The token must come from `TokenRefresher::get_valid_access_token`.
    /// Rate-limited responses are retried with exponential backoff.
    pub async fn get_authorized<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, AuthError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .header(header::ACCEPT, "application/json")
                .send()
                .await?;

            match Self::check_response(response).await {
                Ok(response) => {
                    return response.json().await.map_err(|e| {
                        AuthError::InvalidResponse(format!("Failed to parse {}: {}", url, e))
                    });
                }
                Err(AuthError::RateLimited) if retries < MAX_RATE_LIMIT_RETRIES => {
                    retries += 1;
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, AuthError> {
        debug!(email = %credentials.email, "Sending login request");
        self.post_json("auth/login", credentials).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post_json("auth/refresh", &body).await
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let url = self.url("auth/forgot-password");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/auth/login"), "http://localhost:3000/auth/login");
        assert_eq!(client.url("users?page=1"), "http://localhost:3000/users?page=1");
    }

    #[test]
    fn test_refresh_request_wire_format() {
        let body = RefreshRequest {
            refresh_token: "r1".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"refresh_token":"r1"}"#
        );
    }

    #[test]
    fn test_parse_refresh_response() {
        let json = r#"{
            "access_token": "a2",
            "refresh_token": "r2",
            "expires_in": 900,
            "access_token_expires_at": 1700000900000,
            "refresh_token_expires_at": 1700086400000
        }"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();
        let bundle = parsed.into_bundle(0);
        assert_eq!(bundle.access_token, "a2");
        assert_eq!(bundle.access_token_expires_at, 1_700_000_900_000);
    }
}
