//! Error handling for the musebot daemon
//!
//! A single error type for request handlers and the job pipeline, with HTTP
//! status mapping via Axum's IntoResponse trait.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::provider::ProviderError;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
}

/// Main API error type
#[derive(Error, Debug)]
pub enum ApiError {
    // ========== Queue Pipeline ==========
    /// A search produced nothing to queue
    #[error("no results found for '{0}'")]
    NoResults(String),

    /// Catalog or fetch failure
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The player is unreachable or refused the operation
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Requested resource not found
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    // ========== Authentication & Authorization ==========
    /// Invalid or missing authentication credentials
    #[error("authentication required")]
    Unauthorized,

    /// Unknown user or wrong password
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Invalid token (expired, malformed, revoked)
    #[error("invalid authentication token: {0}")]
    InvalidToken(String),

    /// User lacks permission for the requested operation
    #[error("insufficient permissions: {0}")]
    Forbidden(String),

    // ========== Validation Errors ==========
    /// Request validation failed
    #[error("validation error: {0}")]
    ValidationError(String),

    // ========== Internal Errors ==========
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("internal server error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials | Self::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }

            Self::Forbidden(_) => StatusCode::FORBIDDEN,

            Self::NotFound { .. } | Self::NoResults(_) => StatusCode::NOT_FOUND,

            Self::Backend(BackendError::EntryNotFound(_)) => StatusCode::NOT_FOUND,

            Self::ValidationError(_) | Self::Backend(BackendError::InvalidTrack(_)) => {
                StatusCode::BAD_REQUEST
            }

            Self::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // The catalog or the player failed us
            Self::Provider(_) | Self::Backend(_) => StatusCode::BAD_GATEWAY,

            Self::Configuration(_) | Self::Internal(_) | Self::Jwt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code string for client-side handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoResults(_) => "NO_RESULTS",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Jwt(_) => "JWT_ERROR",
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// Log the error with appropriate severity based on status code
    pub fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Authorization error"
            );
        } else {
            tracing::debug!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Client error"
            );
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<musebot_shared_config::ConfigError> for ApiError {
    fn from(err: musebot_shared_config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
