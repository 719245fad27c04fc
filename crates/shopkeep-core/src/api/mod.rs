//! REST API client module for the admin backend.
//!
//! This module provides the `ApiClient` for the `/auth/*` endpoints and
//! bearer-authenticated reads, along with the typed `AuthError`.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthApi};
pub use error::{AuthError, ErrorKind, ADMIN_ONLY_MESSAGE};
