//! HTTP route handlers for the musebot daemon
//!
//! - `api`: queue, search and now-playing endpoints
//! - `auth`: login, logout and masquerade
//! - `health`: liveness and readiness probes

pub mod api;
pub mod auth;
pub mod health;

pub use api::{queue_router, QueueState};
pub use auth::{auth_router, AuthState};
pub use health::{health_router, HealthState};

use axum::{extract::Extension, Router};

use crate::state::AppState;
use crate::websocket::{ws_router, WsState};

/// Assemble every route
///
/// Layers for tracing and CORS are added by the caller.
pub fn build_router(state: &AppState) -> Router {
    let api = Router::new()
        .merge(auth_router(AuthState::new(state.auth_service.clone())))
        .merge(queue_router(QueueState::new(
            state.pipeline.clone(),
            state.backend.clone(),
        )))
        .nest(
            "/ws",
            ws_router(WsState::new(state.hub.clone(), state.ws_mailbox_capacity)),
        );

    Router::new()
        .nest("/api", api)
        .nest("/health", health_router(HealthState::new(state.backend.clone())))
        .layer(Extension(state.auth_service.clone()))
}
