//! Track references shared by providers, backends and the job pipeline

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A provider-scoped reference to a track plus its cached metadata
///
/// `local_path` is only set once a provider has fetched the audio to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRef {
    /// Registry name of the provider that owns `provider_id`
    pub provider: String,
    /// Provider-local identifier
    pub provider_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Track length in seconds
    #[serde(default)]
    pub length_secs: u32,
    /// Audio file extension as reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Audio file location after a successful fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl TrackRef {
    /// Create a bare reference with no metadata yet
    pub fn new(provider: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            provider_id: provider_id.into(),
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            cover_url: None,
            length_secs: 0,
            format: None,
            local_path: None,
        }
    }

    pub fn with_metadata(
        mut self,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        self.title = title.into();
        self.artist = artist.into();
        self.album = album.into();
        self
    }

    /// Human readable "Artist - Title" label for logs
    pub fn label(&self) -> String {
        match (self.artist.is_empty(), self.title.is_empty()) {
            (false, false) => format!("{} - {}", self.artist, self.title),
            (true, false) => self.title.clone(),
            _ => format!("{}:{}", self.provider, self.provider_id),
        }
    }
}

/// One entry of the player's queue, identified by the backend's stable id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTrack {
    /// Backend-assigned identity; survives reordering
    pub id: u64,
    #[serde(flatten)]
    pub track: TrackRef,
}
