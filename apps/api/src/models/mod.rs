//! Domain models shared across the daemon

pub mod playback;
pub mod track;
pub mod user;

pub use playback::{BackendStatus, CurrentTrack, PlaybackSnapshot, PlaybackState};
pub use track::{QueuedTrack, TrackRef};
pub use user::{AuthToken, Claims, LoginRequest, MasqueradeRequest, User};
