//! Authentication module: the admin session lifecycle.
//!
//! This module provides:
//! - `CredentialStore`: all-or-nothing persistence of tokens, user snapshot and login time
//! - `TokenRefresher`: hands out live access tokens, renewing them 2 minutes before expiry
//! - `SessionManager`: login/logout, the admin-only rule and the 24-hour session window
//! - `guard`: route decisions derived from the session state
//! - `validation`: login form checks
//!
//! A failed token refresh purges storage; `SessionManager::check_session_validity`
//! notices and signs the user out on its next tick.

pub mod credentials;
pub mod guard;
pub mod refresh;
pub mod session;
pub mod validation;

pub use credentials::{CredentialStore, StoredCredentials};
pub use guard::{GuardDecision, Route};
pub use refresh::{TokenRefresher, RENEW_MARGIN_MS};
pub use session::{SessionManager, SessionState, SESSION_CHECK_INTERVAL, SESSION_MAX_AGE_HOURS};
