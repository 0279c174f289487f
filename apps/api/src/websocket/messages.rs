//! WebSocket message types
//!
//! Every frame is a JSON object `{"type": ..., "payload": ...}`. Clients only
//! listen; anything they send other than close/ping frames is ignored.

use serde::{Deserialize, Serialize};

use crate::jobs::JobData;
use crate::models::{PlaybackState, QueuedTrack};
use crate::reconciler::ChangeEvent;

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established for `user`
    Connected { user: String },

    PlaybackStateChanged { state: PlaybackState },

    /// A track entered the queue at `position`
    TrackAdded { position: usize, track: QueuedTrack },

    TrackRemoved { id: u64 },

    /// The queue could not be diffed; clients should refetch it
    ReloadPlaylist,

    /// Progress of one of this user's fetch jobs
    JobData(JobData),

    Error(ErrorPayload),
}

impl From<ChangeEvent> for ServerMessage {
    fn from(event: ChangeEvent) -> Self {
        match event {
            ChangeEvent::PlaybackStateChanged(state) => Self::PlaybackStateChanged { state },
            ChangeEvent::TrackAdded { position, track } => Self::TrackAdded { position, track },
            ChangeEvent::TrackRemoved(id) => Self::TrackRemoved { id },
            ChangeEvent::ReloadPlaylist => Self::ReloadPlaylist,
        }
    }
}

/// Payload for Error message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new("AUTH_FAILED", message)
    }
}
