//! Catalog API client implementation

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogTrack, ErrorResponse, SearchResponse};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Maximum search query length
const MAX_QUERY_LENGTH: usize = 256;

/// Default number of retry attempts for transient failures
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Remote catalog API client
#[derive(Clone)]
pub struct CatalogClient {
    http_client: Client,
    base_url: Url,
    api_key: Option<String>,
    max_retries: u32,
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// An open audio stream for one track
///
/// The catalog must announce the stream size up front so download progress
/// can be reported as `downloaded / length`.
#[derive(Debug)]
pub struct TrackStream {
    response: Response,
    content_length: u64,
}

impl TrackStream {
    /// Total size of the stream in bytes
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Read the next chunk, `None` once the body is exhausted
    pub async fn chunk(&mut self) -> CatalogResult<Option<Bytes>> {
        self.response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout
            } else {
                CatalogError::Http(e)
            }
        })
    }
}

impl CatalogClient {
    /// Create a new catalog client for the given base URL
    ///
    /// # Errors
    /// Returns `CatalogError::InvalidUrl` if the URL does not parse
    pub fn new(base_url: &str, api_key: Option<String>) -> CatalogResult<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> CatalogResult<Self> {
        // Url::join replaces the last segment unless the base ends with '/'
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent("musebot/1.0")
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Override the retry budget (0 disables retries)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate search query input
    fn validate_query(query: &str) -> CatalogResult<&str> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::InvalidInput(
                "query cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_QUERY_LENGTH {
            return Err(CatalogError::InvalidInput(format!(
                "query too long (max {} characters)",
                MAX_QUERY_LENGTH
            )));
        }
        Ok(trimmed)
    }

    fn validate_track_id(id: &str) -> CatalogResult<&str> {
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(CatalogError::InvalidInput(format!(
                "invalid track id '{}'",
                id
            )));
        }
        Ok(trimmed)
    }

    fn request(&self, path: &str) -> CatalogResult<RequestBuilder> {
        let url = self.base_url.join(path)?;
        let mut builder = self.http_client.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        Ok(builder)
    }

    /// Execute an operation with retry logic for transient failures
    async fn with_retry<T, F, Fut>(&self, operation: F) -> CatalogResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay_ms = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                    warn!(
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Catalog request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a request and map non-success statuses onto `CatalogError`
    async fn send(&self, builder: RequestBuilder, track_id: Option<&str>) -> CatalogResult<Response> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout
            } else {
                CatalogError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Catalog API rate limited");
            return Err(CatalogError::RateLimited);
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = track_id {
                return Err(CatalogError::TrackNotFound(id.to_string()));
            }
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);

        Err(CatalogError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Search the catalog
    ///
    /// # Errors
    /// - `CatalogError::InvalidInput` - If the query is empty or too long
    /// - `CatalogError::Api` - If the catalog returns an error status
    /// - `CatalogError::Http` - If the HTTP request fails
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> CatalogResult<Vec<CatalogTrack>> {
        let query = Self::validate_query(query)?;

        debug!(query = %query, "Searching catalog");

        let text = self
            .with_retry(|| async {
                let builder = self.request("search")?.query(&[("q", query)]);
                let response = self.send(builder, None).await?;
                response.text().await.map_err(CatalogError::Http)
            })
            .await?;

        let response: SearchResponse = serde_json::from_str(&text)?;

        debug!(
            query = %query,
            result_count = response.results.len(),
            "Catalog search finished"
        );

        Ok(response.results)
    }

    /// Look up current metadata for a single track
    #[instrument(skip(self))]
    pub async fn track(&self, id: &str) -> CatalogResult<CatalogTrack> {
        let id = Self::validate_track_id(id)?;
        let path = format!("tracks/{}", id);

        let text = self
            .with_retry(|| async {
                let builder = self.request(&path)?;
                let response = self.send(builder, Some(id)).await?;
                response.text().await.map_err(CatalogError::Http)
            })
            .await?;

        Ok(serde_json::from_str(&text)?)
    }

    /// Open the audio stream for a track
    ///
    /// Only the initial request is retried; a body that fails mid-read is
    /// reported to the caller.
    #[instrument(skip(self))]
    pub async fn open_stream(&self, id: &str) -> CatalogResult<TrackStream> {
        let id = Self::validate_track_id(id)?;
        let path = format!("tracks/{}/stream", id);

        let response = self
            .with_retry(|| async {
                let builder = self.request(&path)?;
                self.send(builder, Some(id)).await
            })
            .await?;

        let content_length = response
            .content_length()
            .ok_or_else(|| CatalogError::MissingContentLength(id.to_string()))?;

        debug!(track_id = %id, content_length, "Opened catalog stream");

        Ok(TrackStream {
            response,
            content_length,
        })
    }
}
