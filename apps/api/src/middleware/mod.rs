//! Middleware components for the musebot daemon
//!
//! Authentication extractors for Axum handlers:
//! - `AuthUser`: Requires valid authentication, returns 401 if missing/invalid
//! - `AdminUser`: Requires an administrator, returns 403 if not admin

pub mod auth;

pub use auth::{extract_bearer_token, AdminUser, AuthRejection, AuthUser};
