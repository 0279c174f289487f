//! musebot daemon library
//!
//! This module exposes the core daemon components for use in integration
//! tests and by the `musebotd` binary.

pub mod backend;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod provider;
pub mod reconciler;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use services::{AuthConfig, AuthService};
pub use state::AppState;
