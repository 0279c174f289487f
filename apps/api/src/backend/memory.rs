//! Simulated player kept entirely in memory
//!
//! Behaves like MPD in consume mode: adding to a stopped player clears the
//! queue and starts playback, finishing a track drops it from the queue.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{BackendError, BackendResult, PlaybackBackend};
use crate::models::{BackendStatus, CurrentTrack, PlaybackState, QueuedTrack, TrackRef};

#[derive(Debug)]
struct PlayerState {
    state: PlaybackState,
    playlist_version: u64,
    next_id: u64,
    tracks: Vec<QueuedTrack>,
    position_secs: f64,
    available: bool,
    reconnects: u32,
}

impl PlayerState {
    fn bump(&mut self) {
        self.playlist_version += 1;
    }

    fn ensure_available(&self) -> BackendResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(BackendError::Unavailable("simulated player offline".to_string()))
        }
    }
}

/// In-process backend for development and tests
#[derive(Debug)]
pub struct InMemoryBackend {
    inner: Mutex<PlayerState>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PlayerState {
                state: PlaybackState::Stopped,
                playlist_version: 0,
                next_id: 1,
                tracks: Vec::new(),
                position_secs: 0.0,
                available: true,
                reconnects: 0,
            }),
        }
    }

    pub async fn set_state(&self, state: PlaybackState) {
        let mut inner = self.inner.lock().await;
        inner.state = state;
    }

    /// Finish the current track; the next one starts, or the player stops
    pub async fn skip(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.state.has_current_track() || inner.tracks.is_empty() {
            return;
        }
        inner.tracks.remove(0);
        inner.position_secs = 0.0;
        inner.bump();
        if inner.tracks.is_empty() {
            inner.state = PlaybackState::Stopped;
        }
    }

    pub async fn set_position(&self, position_secs: f64) {
        self.inner.lock().await.position_secs = position_secs;
    }

    /// Simulate the player going away (`false`) or coming back
    pub async fn set_available(&self, available: bool) {
        self.inner.lock().await.available = available;
    }

    pub async fn reconnect_count(&self) -> u32 {
        self.inner.lock().await.reconnects
    }
}

#[async_trait]
impl PlaybackBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn status(&self) -> BackendResult<BackendStatus> {
        let inner = self.inner.lock().await;
        inner.ensure_available()?;
        Ok(BackendStatus {
            state: inner.state,
            playlist_version: inner.playlist_version,
        })
    }

    async fn playback_queue(&self) -> BackendResult<Vec<QueuedTrack>> {
        let inner = self.inner.lock().await;
        inner.ensure_available()?;
        Ok(inner.tracks.clone())
    }

    async fn current_track(&self) -> BackendResult<Option<CurrentTrack>> {
        let inner = self.inner.lock().await;
        inner.ensure_available()?;
        if !inner.state.has_current_track() {
            return Ok(None);
        }
        Ok(inner.tracks.first().map(|entry| CurrentTrack {
            entry: entry.clone(),
            state: inner.state,
            position_secs: inner.position_secs,
        }))
    }

    async fn add(&self, track: &TrackRef) -> BackendResult<()> {
        if track.local_path.is_none() {
            return Err(BackendError::InvalidTrack(format!(
                "{} has not been fetched",
                track.label()
            )));
        }

        let mut inner = self.inner.lock().await;
        inner.ensure_available()?;
        if inner.state == PlaybackState::Stopped {
            inner.tracks.clear();
            inner.position_secs = 0.0;
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.tracks.push(QueuedTrack {
            id,
            track: track.clone(),
        });
        inner.bump();
        inner.state = PlaybackState::Playing;

        tracing::debug!(id, track = %track.label(), "Simulated player queued track");
        Ok(())
    }

    async fn remove(&self, id: u64) -> BackendResult<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_available()?;
        let index = inner
            .tracks
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(BackendError::EntryNotFound(id))?;

        inner.tracks.remove(index);
        inner.bump();
        if index == 0 {
            inner.position_secs = 0.0;
        }
        if inner.tracks.is_empty() {
            inner.state = PlaybackState::Stopped;
        }
        Ok(())
    }

    async fn reconnect(&self) -> BackendResult<()> {
        let mut inner = self.inner.lock().await;
        inner.reconnects += 1;
        inner.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(id: &str) -> TrackRef {
        let mut track = TrackRef::new("catalog", id).with_metadata(id, "Artist", "Album");
        track.local_path = Some(format!("/cache/{}.mp3", id).into());
        track
    }

    #[tokio::test]
    async fn test_add_starts_playback_and_bumps_version() {
        let backend = InMemoryBackend::new();
        backend.add(&fetched("a")).await.unwrap();

        let status = backend.status().await.unwrap();
        assert_eq!(status.state, PlaybackState::Playing);
        assert_eq!(status.playlist_version, 1);

        let current = backend.current_track().await.unwrap().unwrap();
        assert_eq!(current.entry.track.provider_id, "a");
    }

    #[tokio::test]
    async fn test_add_to_stopped_player_clears_queue() {
        let backend = InMemoryBackend::new();
        backend.add(&fetched("a")).await.unwrap();
        backend.add(&fetched("b")).await.unwrap();
        backend.set_state(PlaybackState::Stopped).await;
        backend.add(&fetched("c")).await.unwrap();

        let queue = backend.playback_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].track.provider_id, "c");
        assert_eq!(queue[0].id, 3);
    }

    #[tokio::test]
    async fn test_add_requires_fetched_track() {
        let backend = InMemoryBackend::new();
        let result = backend.add(&TrackRef::new("catalog", "x")).await;
        assert!(matches!(result, Err(BackendError::InvalidTrack(_))));
    }

    #[tokio::test]
    async fn test_remove_unknown_entry() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.remove(99).await,
            Err(BackendError::EntryNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_skip_consumes_tracks() {
        let backend = InMemoryBackend::new();
        backend.add(&fetched("a")).await.unwrap();
        backend.add(&fetched("b")).await.unwrap();

        backend.skip().await;
        let queue = backend.playback_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].track.provider_id, "b");

        backend.skip().await;
        assert_eq!(backend.status().await.unwrap().state, PlaybackState::Stopped);
        assert_eq!(backend.status().await.unwrap().playlist_version, 4);
    }

    #[tokio::test]
    async fn test_snapshot_combines_status_and_queue() {
        let backend = InMemoryBackend::new();
        backend.add(&fetched("a")).await.unwrap();
        backend.set_position(30.0).await;

        let snapshot = backend.snapshot().await.unwrap();
        assert_eq!(snapshot.tracks.len(), 1);
        assert_eq!(snapshot.current.unwrap().position_secs, 30.0);
    }

    #[tokio::test]
    async fn test_offline_player() {
        let backend = InMemoryBackend::new();
        backend.set_available(false).await;
        assert!(matches!(
            backend.status().await,
            Err(BackendError::Unavailable(_))
        ));
        assert!(backend.reconnect().await.is_err());
        backend.set_available(true).await;
        assert!(backend.reconnect().await.is_ok());
        assert_eq!(backend.reconnect_count().await, 2);
    }
}
