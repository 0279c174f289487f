//! Playback backends: the external player that owns the queue

mod memory;
mod mpd;
mod registry;

pub use memory::InMemoryBackend;
pub use mpd::MpdBackend;
pub use registry::{build_backend, BackendFactory, BACKEND_FACTORIES};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{BackendStatus, CurrentTrack, PlaybackSnapshot, QueuedTrack, TrackRef};

/// Backend failures
#[derive(Error, Debug)]
pub enum BackendError {
    /// The player could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The player answered with something we could not understand
    #[error("backend protocol error: {0}")]
    Protocol(String),

    /// The player refused a command
    #[error("backend rejected '{command}': {message}")]
    Rejected { command: String, message: String },

    /// The track cannot be queued as given
    #[error("invalid track: {0}")]
    InvalidTrack(String),

    /// No queue entry with this id
    #[error("queue entry not found: {0}")]
    EntryNotFound(u64),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// An external player
///
/// The playlist version must increase on every queue mutation; the
/// reconciler polls `status` every tick and only fetches the queue when the
/// version moves.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn status(&self) -> BackendResult<BackendStatus>;

    /// Upcoming queue, current track first when playing or paused
    async fn playback_queue(&self) -> BackendResult<Vec<QueuedTrack>>;

    async fn current_track(&self) -> BackendResult<Option<CurrentTrack>>;

    async fn snapshot(&self) -> BackendResult<PlaybackSnapshot> {
        let status = self.status().await?;
        let tracks = self.playback_queue().await?;
        let current = if status.state.has_current_track() {
            self.current_track().await?
        } else {
            None
        };
        Ok(PlaybackSnapshot {
            state: status.state,
            playlist_version: status.playlist_version,
            tracks,
            current,
        })
    }

    /// Enqueue a fetched track (`local_path` must be set)
    async fn add(&self, track: &TrackRef) -> BackendResult<()>;

    async fn remove(&self, id: u64) -> BackendResult<()>;

    /// Drop and re-establish the connection to the player
    async fn reconnect(&self) -> BackendResult<()>;
}
