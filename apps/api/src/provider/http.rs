//! Provider backed by the remote JSON catalog
//!
//! Fetched audio lands in the configured cache directory as
//! `<provider_id>.<format>`. A track already in the cache is reported as a
//! zero-stage fetch. Each download streams into its own temporary file in the
//! cache directory and is renamed into place once complete, so concurrent
//! fetches of the same track never share a partial file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use musebot_catalog_client::{CatalogClient, CatalogTrack};
use musebot_shared_config::CatalogConfig;
use tokio::io::AsyncWriteExt;

use super::{ensure_owned, CatalogProvider, ProviderError, ProviderResult};
use crate::jobs::ProgressSender;
use crate::models::TrackRef;

/// Longest accepted file extension
const MAX_FORMAT_LEN: usize = 16;

pub struct HttpCatalogProvider {
    name: String,
    display_name: String,
    client: CatalogClient,
    cache_dir: PathBuf,
}

impl HttpCatalogProvider {
    pub fn new(config: &CatalogConfig) -> ProviderResult<Self> {
        let client = CatalogClient::with_timeout(
            &config.url,
            config.api_key.clone(),
            config.timeout_secs,
        )?;
        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured client (retry settings, tests)
    pub fn with_client(config: &CatalogConfig, client: CatalogClient) -> Self {
        Self {
            name: config.name.clone(),
            display_name: config.display_name.clone(),
            client,
            cache_dir: config.cache_dir.clone(),
        }
    }

    fn to_track_ref(&self, track: CatalogTrack) -> TrackRef {
        TrackRef {
            provider: self.name.clone(),
            provider_id: track.id,
            title: track.title,
            artist: track.artist,
            album: track.album,
            cover_url: track.cover_url,
            length_secs: track.duration,
            format: Some(track.format),
            local_path: None,
        }
    }

    fn cache_path(&self, id: &str, format: &str) -> ProviderResult<PathBuf> {
        Ok(self.cache_dir.join(cache_file_name(id, format)?))
    }

    async fn download(
        &self,
        id: &str,
        path: &Path,
        progress: &ProgressSender,
    ) -> ProviderResult<()> {
        let mut stream = self.client.open_stream(id).await?;
        let expected = stream.content_length();
        progress.length(expected).await;

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        // Removed on drop unless persisted
        let (file, partial) = tempfile::Builder::new()
            .prefix(&format!(".{}.", id))
            .suffix(".part")
            .tempfile_in(&self.cache_dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut received: u64 = 0;
        while let Some(chunk) = stream.chunk().await? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            progress.downloaded(received).await;
        }
        file.flush().await?;
        drop(file);

        if received != expected {
            return Err(ProviderError::IncompleteDownload { expected, received });
        }

        partial.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Cache file name for a track, refusing anything that is not a plain name
fn cache_file_name(id: &str, format: &str) -> ProviderResult<String> {
    let id_ok = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !id_ok {
        return Err(ProviderError::UnsafeFileName(format!("track id '{}'", id.escape_debug())));
    }

    let format_ok = !format.is_empty()
        && format.len() <= MAX_FORMAT_LEN
        && format.chars().all(|c| c.is_ascii_alphanumeric());
    if !format_ok {
        return Err(ProviderError::UnsafeFileName(format!("format '{}'", format.escape_debug())));
    }

    Ok(format!("{}.{}", id, format))
}

#[async_trait]
impl CatalogProvider for HttpCatalogProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn search(&self, query: &str) -> ProviderResult<Vec<TrackRef>> {
        let results = self.client.search(query).await?;
        Ok(results.into_iter().map(|t| self.to_track_ref(t)).collect())
    }

    async fn refresh_metadata(&self, track: TrackRef) -> ProviderResult<TrackRef> {
        ensure_owned(self, &track)?;
        let info = self.client.track(&track.provider_id).await?;
        Ok(TrackRef {
            provider_id: track.provider_id,
            local_path: track.local_path,
            ..self.to_track_ref(info)
        })
    }

    async fn fetch(&self, track: TrackRef, progress: ProgressSender) -> ProviderResult<TrackRef> {
        ensure_owned(self, &track)?;
        let format = match &track.format {
            Some(format) => format.clone(),
            None => self.client.track(&track.provider_id).await?.format,
        };
        let path = self.cache_path(&track.provider_id, &format)?;

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(track = %track.label(), path = %path.display(), "Cache hit");
            progress.stages(0).await;
        } else {
            progress.stages(1).await;
            progress.current_stage(1).await;
            progress
                .current_stage_description("Downloading file...")
                .await;
            self.download(&track.provider_id, &path, &progress).await?;
            tracing::info!(track = %track.label(), path = %path.display(), "Track downloaded");
        }

        Ok(TrackRef {
            format: Some(format),
            local_path: Some(path),
            ..track
        })
    }
}
