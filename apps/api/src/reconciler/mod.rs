//! Backend state reconciler
//!
//! Polls the playback backend on a fixed interval and turns differences
//! between consecutive snapshots into [`ChangeEvent`]s. Within one tick the
//! order is: state change, additions, removals. The last-known snapshot is
//! only replaced after every event of the tick has been handed off.

mod diff;

pub use diff::diff_playlists;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::PlaybackBackend;
use crate::models::{PlaybackState, QueuedTrack};
use crate::websocket::HubHandle;

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A discrete change in the player's state
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    PlaybackStateChanged(PlaybackState),
    TrackAdded { position: usize, track: QueuedTrack },
    TrackRemoved(u64),
    /// The queue changed but could not be read; clients must refetch it
    ReloadPlaylist,
}

#[derive(Debug, Clone)]
struct Known {
    state: PlaybackState,
    playlist_version: u64,
    tracks: Vec<QueuedTrack>,
}

/// Event consumer went away
#[derive(Debug)]
pub struct EventsClosed;

pub struct Reconciler {
    backend: Arc<dyn PlaybackBackend>,
    events: mpsc::Sender<ChangeEvent>,
    interval: Duration,
    last: Option<Known>,
}

impl Reconciler {
    pub fn new(
        backend: Arc<dyn PlaybackBackend>,
        events: mpsc::Sender<ChangeEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            events,
            interval,
            last: None,
        }
    }

    /// Poll until cancelled or until the event channel closes
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            backend = self.backend.name(),
            interval_ms = self.interval.as_millis() as u64,
            "Reconciler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if self.poll_once().await.is_err() {
                        tracing::info!("Change event consumer closed, stopping reconciler");
                        break;
                    }
                }
            }
        }

        tracing::info!("Reconciler stopped");
    }

    /// One reconciliation step
    ///
    /// The first successful poll only records the backend's state.
    pub async fn poll_once(&mut self) -> Result<(), EventsClosed> {
        let status = match self.backend.status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Backend status poll failed, reconnecting");
                if let Err(e) = self.backend.reconnect().await {
                    tracing::debug!(error = %e, "Backend reconnect failed");
                }
                return Ok(());
            }
        };

        let Some(last) = self.last.as_ref() else {
            match self.backend.playback_queue().await {
                Ok(tracks) => {
                    tracing::debug!(
                        state = %status.state,
                        version = status.playlist_version,
                        tracks = tracks.len(),
                        "Initial backend snapshot"
                    );
                    self.last = Some(Known {
                        state: status.state,
                        playlist_version: status.playlist_version,
                        tracks,
                    });
                }
                Err(e) => tracing::warn!(error = %e, "Initial queue fetch failed"),
            }
            return Ok(());
        };

        let mut next = last.clone();

        if status.state != last.state {
            self.emit(ChangeEvent::PlaybackStateChanged(status.state))
                .await?;
            next.state = status.state;
        }

        if status.playlist_version != last.playlist_version {
            match self.backend.playback_queue().await {
                Ok(tracks) => {
                    for event in diff_playlists(&last.tracks, &tracks) {
                        self.emit(event).await?;
                    }
                    next.playlist_version = status.playlist_version;
                    next.tracks = tracks;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        version = status.playlist_version,
                        "Queue fetch failed, asking clients to reload"
                    );
                    self.emit(ChangeEvent::ReloadPlaylist).await?;
                }
            }
        }

        self.last = Some(next);
        Ok(())
    }

    async fn emit(&self, event: ChangeEvent) -> Result<(), EventsClosed> {
        self.events.send(event).await.map_err(|_| EventsClosed)
    }
}

/// Push every change event to all connected clients
pub async fn forward_events(mut events: mpsc::Receiver<ChangeEvent>, hub: HubHandle) {
    while let Some(event) = events.recv().await {
        hub.broadcast_all(event.into()).await;
    }
    tracing::debug!("Change event channel closed");
}
