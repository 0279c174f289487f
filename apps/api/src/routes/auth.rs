//! Authentication REST route handlers
//!
//! - `POST /api/login` - Exchange username/password for a token
//! - `POST /api/logout` - Revoke the presented token
//! - `POST /api/masquerade` - Administrator obtains a token for another user

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::error::ApiResult;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{AuthToken, LoginRequest, MasqueradeRequest};
use crate::services::AuthService;

/// Shared application state for auth handlers
#[derive(Clone)]
pub struct AuthState {
    pub auth_service: AuthService,
}

impl AuthState {
    pub fn new(auth_service: AuthService) -> Self {
        Self { auth_service }
    }
}

/// Create authentication router
pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/masquerade", post(masquerade))
        .with_state(state)
}

async fn login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthToken>> {
    let token = state
        .auth_service
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(token))
}

async fn logout(State(state): State<AuthState>, auth: AuthUser) -> StatusCode {
    state.auth_service.logout(&auth.claims);
    StatusCode::NO_CONTENT
}

async fn masquerade(
    State(state): State<AuthState>,
    admin: AdminUser,
    Json(request): Json<MasqueradeRequest>,
) -> ApiResult<Json<AuthToken>> {
    let token = state
        .auth_service
        .masquerade(&admin.claims, &request.username)
        .await?;
    Ok(Json(token))
}
