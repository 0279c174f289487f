//! Authentication extractors for Axum handlers
//!
//! - `AuthUser`: Requires a valid bearer token, returns 401 if missing/invalid
//! - `AdminUser`: Requires an administrator token, returns 403 otherwise
//!
//! Both read the [`AuthService`] from request extensions.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn protected_handler(auth: AuthUser) -> impl IntoResponse {
//!     format!("Hello, {}!", auth.user.username)
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::models::{Claims, User};
use crate::services::AuthService;

/// Authenticated user extractor
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// JWT claims from the access token
    pub claims: Claims,
}

/// Administrator-only extractor
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user: User,
    pub claims: Claims,
}

/// Authentication rejection types
#[derive(Debug)]
pub enum AuthRejection {
    /// Missing or invalid Authorization header
    MissingToken,
    /// Token is malformed, expired or revoked
    InvalidToken(String),
    /// User lacks required admin permissions
    InsufficientPermissions,
    /// AuthService is not installed as an extension
    MissingServices,
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::MissingToken => ApiError::Unauthorized,
            AuthRejection::InvalidToken(reason) => ApiError::InvalidToken(reason),
            AuthRejection::InsufficientPermissions => {
                ApiError::Forbidden("admin access required".to_string())
            }
            AuthRejection::MissingServices => {
                ApiError::Internal("Authentication services not configured".to_string())
            }
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Extract the bearer token from the Authorization header (case-insensitive scheme)
pub fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() && !token.contains(' ') {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts).ok_or(AuthRejection::MissingToken)?;

        let auth_service = parts
            .extensions
            .get::<AuthService>()
            .ok_or(AuthRejection::MissingServices)?;

        let claims = auth_service
            .verify_access_token(token)
            .map_err(|e| AuthRejection::InvalidToken(e.to_string()))?;

        Ok(AuthUser {
            user: claims.user(),
            claims,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.administrator {
            tracing::warn!(user = %auth.user.username, "Admin access denied");
            return Err(AuthRejection::InsufficientPermissions);
        }
        Ok(AdminUser {
            user: auth.user,
            claims: auth.claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&parts_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(extract_bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(extract_bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(extract_bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(extract_bearer_token(&parts_with(Some("Bearer a b"))), None);
        assert_eq!(extract_bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::InsufficientPermissions.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::MissingServices.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_missing_service_extension() {
        let mut parts = parts_with(Some("Bearer abc"));
        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::MissingServices)));
    }
}
