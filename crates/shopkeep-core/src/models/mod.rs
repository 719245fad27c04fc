//! Data models shared by the auth core and the HTTP layer.
//!
//! `User` is the snapshot of the signed-in account that gets persisted next
//! to the tokens; the token types mirror the backend's `/auth/*` payloads.

pub mod token;
pub mod user;

pub use token::{LoginRequest, LoginResponse, RefreshRequest, TokenBundle, TokenResponse};
pub use user::{User, UserRole};
