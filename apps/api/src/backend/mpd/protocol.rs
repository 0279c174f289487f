//! MPD text protocol helpers
//!
//! Responses are `key: value` lines terminated by `OK`, or a single
//! `ACK [error@command_listNum] {current_command} message_text` line.

use std::path::Path;

use crate::backend::{BackendError, BackendResult};
use crate::models::{BackendStatus, PlaybackState, QueuedTrack, TrackRef};

/// MPD's "no such object" ACK code
pub const ACK_NO_EXIST: u32 = 50;

pub type Pairs = Vec<(String, String)>;

/// Provider name for queue entries musebot did not add itself
pub const LOCAL_PROVIDER: &str = "local";

/// Quote a command argument
///
/// Commands are newline-terminated, so an argument containing a line break
/// cannot be sent at all.
pub fn quote(arg: &str) -> BackendResult<String> {
    if arg.contains(['\n', '\r']) {
        return Err(BackendError::InvalidTrack(format!(
            "argument {:?} contains a line break",
            arg
        )));
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Ok(out)
}

/// Split a response line into key and value
pub fn parse_pair(line: &str) -> BackendResult<(String, String)> {
    line.split_once(": ")
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| BackendError::Protocol(format!("malformed response line '{}'", line)))
}

/// A parsed `ACK` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub code: u32,
    pub command: String,
    pub message: String,
}

impl Ack {
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("ACK [")?;
        let (code, rest) = rest.split_once('@')?;
        let (_, rest) = rest.split_once("] {")?;
        let (command, message) = rest.split_once("} ")?;
        Some(Self {
            code: code.parse().ok()?,
            command: command.to_string(),
            message: message.to_string(),
        })
    }

    pub fn into_error(self) -> BackendError {
        BackendError::Rejected {
            command: self.command,
            message: format!("[{}] {}", self.code, self.message),
        }
    }
}

fn get<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_field<T: std::str::FromStr>(pairs: &[(String, String)], key: &str) -> BackendResult<T> {
    let raw = get(pairs, key)
        .ok_or_else(|| BackendError::Protocol(format!("missing '{}' in response", key)))?;
    raw.parse()
        .map_err(|_| BackendError::Protocol(format!("invalid '{}' value '{}'", key, raw)))
}

/// The subset of `status` musebot uses
#[derive(Debug, Clone, PartialEq)]
pub struct MpdStatus {
    pub state: PlaybackState,
    pub playlist_version: u64,
    pub playlist_length: usize,
    /// Position of the current song in the queue
    pub song_pos: Option<usize>,
    pub elapsed_secs: Option<f64>,
}

impl MpdStatus {
    pub fn parse(pairs: &[(String, String)]) -> BackendResult<Self> {
        let state = get(pairs, "state")
            .ok_or_else(|| BackendError::Protocol("missing 'state' in status".to_string()))?
            .parse::<PlaybackState>()
            .map_err(BackendError::Protocol)?;

        Ok(Self {
            state,
            playlist_version: parse_field(pairs, "playlist")?,
            playlist_length: parse_field(pairs, "playlistlength")?,
            song_pos: get(pairs, "song").and_then(|v| v.parse().ok()),
            elapsed_secs: get(pairs, "elapsed").and_then(|v| v.parse().ok()),
        })
    }

    pub fn to_backend_status(&self) -> BackendStatus {
        BackendStatus {
            state: self.state,
            playlist_version: self.playlist_version,
        }
    }
}

/// One queue entry from `playlistinfo` / `currentsong`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MpdSong {
    pub file: String,
    pub id: u64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub time_secs: u32,
}

impl MpdSong {
    /// Split a song list response; each song starts at a `file` key
    pub fn parse_list(pairs: &[(String, String)]) -> BackendResult<Vec<Self>> {
        let mut songs = Vec::new();
        let mut current: Option<MpdSong> = None;

        for (key, value) in pairs {
            match key.as_str() {
                "file" => {
                    if let Some(song) = current.take() {
                        songs.push(song);
                    }
                    current = Some(MpdSong {
                        file: value.clone(),
                        ..Default::default()
                    });
                }
                _ => {
                    let Some(song) = current.as_mut() else {
                        continue;
                    };
                    match key.as_str() {
                        "Id" => {
                            song.id = value.parse().map_err(|_| {
                                BackendError::Protocol(format!("invalid song id '{}'", value))
                            })?
                        }
                        "Title" => song.title = Some(value.clone()),
                        "Artist" => song.artist = Some(value.clone()),
                        "Album" => song.album = Some(value.clone()),
                        "Time" => song.time_secs = value.parse().unwrap_or(0),
                        _ => {}
                    }
                }
            }
        }
        songs.extend(current);
        Ok(songs)
    }

    /// Build a queue entry, preferring musebot's stored metadata
    pub fn into_queued(self, music_dir: &Path, stored: Option<TrackRef>) -> QueuedTrack {
        let local_path = Some(music_dir.join(&self.file));
        let mut track = stored.unwrap_or_else(|| TrackRef {
            provider: LOCAL_PROVIDER.to_string(),
            provider_id: self.file.clone(),
            title: self.title.clone().unwrap_or_default(),
            artist: self.artist.clone().unwrap_or_default(),
            album: self.album.clone().unwrap_or_default(),
            cover_url: None,
            length_secs: 0,
            format: None,
            local_path: None,
        });
        track.local_path = local_path;
        if self.time_secs > 0 {
            track.length_secs = self.time_secs;
        }
        QueuedTrack { id: self.id, track }
    }
}

/// Decode the value of `sticker get`: `sticker: songinfo=<json>`
pub fn parse_songinfo_sticker(pairs: &[(String, String)]) -> Option<TrackRef> {
    let raw = get(pairs, "sticker")?;
    let json = raw.strip_prefix("songinfo=")?;
    serde_json::from_str(json).ok()
}
