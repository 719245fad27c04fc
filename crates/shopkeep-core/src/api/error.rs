use serde::Deserialize;
use thiserror::Error;

/// Coarse classification of an [`AuthError`], for callers that branch on
/// the failure category rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    NetworkError,
    ValidationError,
    AccessDenied,
    StorageError,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

/// Storage backends report through anyhow; keep the whole context chain.
impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Storage(format!("{:#}", err))
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shown to admins who authenticate successfully but lack the ADMIN role.
pub const ADMIN_ONLY_MESSAGE: &str = "Access denied. Only administrators can use this application.";

const CONNECTIVITY_MESSAGE: &str = "Could not reach the server. Please try again.";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<serde_json::Value>,
}

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the backend's `{message}` out of an error body. Validation
    /// failures sometimes send an array of messages; those get joined.
    fn backend_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.message? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => None,
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::backend_message(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            400 | 422 => AuthError::Validation(message),
            401 => AuthError::Unauthorized(message),
            403 => AuthError::AccessDenied(message),
            404 => AuthError::NotFound(message),
            429 => AuthError::RateLimited,
            500..=599 => AuthError::ServerError(message),
            _ => AuthError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unauthorized(_) => ErrorKind::Unauthorized,
            AuthError::AccessDenied(_) => ErrorKind::AccessDenied,
            AuthError::Validation(_) => ErrorKind::ValidationError,
            AuthError::Storage(_) => ErrorKind::StorageError,
            AuthError::NotFound(_)
            | AuthError::RateLimited
            | AuthError::ServerError(_)
            | AuthError::Network(_)
            | AuthError::InvalidResponse(_) => ErrorKind::NetworkError,
        }
    }

    /// Text suitable for showing to the person at the login prompt.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::AccessDenied(msg)
            | AuthError::Unauthorized(msg)
            | AuthError::Validation(msg) => msg.clone(),
            AuthError::Network(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Storage(_) => "Could not save your session on this device.".to_string(),
            _ => CONNECTIVITY_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_backend_message() {
        let err = AuthError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid credentials","statusCode":401}"#,
        );
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_from_status_joins_validation_messages() {
        let err = AuthError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":["email must be an email","password should not be empty"]}"#,
        );
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(
            err.user_message(),
            "email must be an email; password should not be empty"
        );
    }

    #[test]
    fn test_server_errors_are_network_kind() {
        let err = AuthError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(err.user_message(), CONNECTIVITY_MESSAGE);
        assert!(matches!(
            AuthError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            AuthError::RateLimited
        ));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let err = AuthError::from_status(StatusCode::IM_A_TEAPOT, &body);
        let AuthError::InvalidResponse(msg) = err else {
            panic!("expected InvalidResponse");
        };
        assert!(msg.contains("truncated"));
    }
}
