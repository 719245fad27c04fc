//! Login form validation, run before anything is sent to the backend.

use std::sync::LazyLock;

use regex::Regex;

use crate::api::AuthError;

/// Minimum password length for new accounts
pub const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain
/// with something on both sides of it.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn email_error(email: &str) -> Option<&'static str> {
    let email = email.trim();
    if email.is_empty() {
        Some("Email is required")
    } else if !is_valid_email(email) {
        Some("Invalid email")
    } else {
        None
    }
}

pub fn password_error(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Password is required")
    } else {
        None
    }
}

/// Stricter check for account creation, not applied at login.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

pub fn validate_login(email: &str, password: &str) -> Result<(), AuthError> {
    if let Some(message) = email_error(email).or_else(|| password_error(password)) {
        return Err(AuthError::Validation(message.to_string()));
    }
    Ok(())
}
