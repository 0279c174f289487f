//! Player state as reported by a playback backend

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::track::QueuedTrack;

/// Transport state of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// Whether a current track exists in this state
    pub fn has_current_track(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

impl FromStr for PlaybackState {
    type Err = String;

    /// Accepts both MPD's short names (`play`, `pause`, `stop`) and the long forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" | "playing" => Ok(Self::Playing),
            "pause" | "paused" => Ok(Self::Paused),
            "stop" | "stopped" => Ok(Self::Stopped),
            other => Err(format!("unknown playback state '{}'", other)),
        }
    }
}

/// Lightweight status poll result
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStatus {
    pub state: PlaybackState,
    /// Opaque counter bumped by the player on every queue mutation
    pub playlist_version: u64,
}

/// The track currently loaded in the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTrack {
    #[serde(flatten)]
    pub entry: QueuedTrack,
    pub state: PlaybackState,
    /// Elapsed time in seconds
    pub position_secs: f64,
}

impl CurrentTrack {
    /// Elapsed fraction of the track, 0.0 when the length is unknown
    pub fn percent_position(&self) -> f64 {
        let length = self.entry.track.length_secs;
        if length == 0 {
            return 0.0;
        }
        (self.position_secs / f64::from(length)).clamp(0.0, 1.0)
    }
}

/// Full player view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub playlist_version: u64,
    pub tracks: Vec<QueuedTrack>,
    pub current: Option<CurrentTrack>,
}
