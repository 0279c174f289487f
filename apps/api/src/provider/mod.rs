//! Catalog providers: where tracks are searched for and fetched from

mod http;
mod registry;

pub use http::HttpCatalogProvider;
pub use registry::{ProviderFactory, ProviderInfo, ProviderRegistry, PROVIDER_FACTORIES};

use async_trait::async_trait;
use musebot_catalog_client::CatalogError;
use thiserror::Error;

use crate::jobs::ProgressSender;
use crate::models::TrackRef;

/// Provider failures
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The remote catalog failed or rejected the request
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Writing the fetched file failed
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A track reference was handed to a provider that does not own it
    #[error("track belongs to provider '{actual}', not '{expected}'")]
    ProviderMismatch { expected: String, actual: String },

    /// The body ended before the announced length was reached
    #[error("incomplete download: got {received} of {expected} bytes")]
    IncompleteDownload { expected: u64, received: u64 },

    /// A track id or format that cannot safely name a cache file
    #[error("unsafe cache file name: {0}")]
    UnsafeFileName(String),

    /// The fetch task panicked or was aborted
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A source of tracks
///
/// `fetch` reports non-terminal progress through `progress` and returns the
/// fetched track with `local_path` set. Whatever it returns becomes the
/// stream's single terminal message.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Registry name, also stored in [`TrackRef::provider`]
    fn name(&self) -> &str;

    /// Human readable name for `available_providers`
    fn display_name(&self) -> &str;

    async fn search(&self, query: &str) -> ProviderResult<Vec<TrackRef>>;

    /// Re-read the track's metadata from the source
    async fn refresh_metadata(&self, track: TrackRef) -> ProviderResult<TrackRef>;

    async fn fetch(&self, track: TrackRef, progress: ProgressSender) -> ProviderResult<TrackRef>;
}

/// Reject references owned by another provider
pub(crate) fn ensure_owned(provider: &dyn CatalogProvider, track: &TrackRef) -> ProviderResult<()> {
    if track.provider != provider.name() {
        return Err(ProviderError::ProviderMismatch {
            expected: provider.name().to_string(),
            actual: track.provider.clone(),
        });
    }
    Ok(())
}
