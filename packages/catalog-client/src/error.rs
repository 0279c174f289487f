//! Catalog API error types

use thiserror::Error;

/// Catalog client errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Invalid input provided to a client method
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Base URL could not be parsed or joined
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse catalog response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog returned an error status
    #[error("Catalog API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Track id unknown to the catalog
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Stream response did not announce its size
    #[error("Stream for track {0} has no Content-Length")]
    MissingContentLength(String),

    /// Rate limited by the catalog
    #[error("Rate limited by catalog API")]
    RateLimited,

    /// Request timeout
    #[error("Request to catalog timed out")]
    Timeout,
}

impl CatalogError {
    /// Check if this error is retryable (transient failure)
    ///
    /// Retries on timeouts, rate limiting, transport errors and 5xx
    /// responses. Client errors are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Timeout | CatalogError::RateLimited => true,
            CatalogError::Api { status, .. } => *status >= 500,
            CatalogError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.is_server_error())
            }
            _ => false,
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
