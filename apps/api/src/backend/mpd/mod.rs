//! Music Player Daemon backend
//!
//! A single actor task owns the MPD connection; `MpdBackend` methods send it
//! one command at a time over a channel and await the reply on a oneshot. The
//! connection is opened lazily, put into consume mode on every (re)connect
//! and dropped after any I/O failure so the next request reconnects.

mod protocol;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use musebot_shared_config::MpdConfig;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::sync::{mpsc, oneshot};

use self::protocol::{quote, Ack, MpdSong, MpdStatus, Pairs, ACK_NO_EXIST};
use super::{BackendError, BackendResult, PlaybackBackend};
use crate::models::{BackendStatus, CurrentTrack, QueuedTrack, TrackRef};

/// Queued requests before callers start waiting
const REQUEST_BUFFER: usize = 32;

/// How many times `addid` is retried while MPD indexes a new file
const INDEX_RETRIES: u32 = 20;
const INDEX_RETRY_DELAY: Duration = Duration::from_millis(100);

trait Io: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

/// One open MPD session
struct Session {
    stream: BufStream<Box<dyn Io>>,
    timeout: Duration,
}

impl Session {
    async fn open(config: &MpdConfig) -> BackendResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let io: Box<dyn Io> = match config.network.as_str() {
            #[cfg(unix)]
            "unix" => Box::new(
                tokio::time::timeout(timeout, tokio::net::UnixStream::connect(&config.addr))
                    .await
                    .map_err(|_| BackendError::Unavailable(format!("connect to {} timed out", config.addr)))??,
            ),
            _ => Box::new(
                tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&config.addr))
                    .await
                    .map_err(|_| BackendError::Unavailable(format!("connect to {} timed out", config.addr)))??,
            ),
        };

        let mut session = Self {
            stream: BufStream::new(io),
            timeout,
        };

        let greeting = session.read_line().await?;
        if !greeting.starts_with("OK MPD") {
            return Err(BackendError::Protocol(format!(
                "unexpected greeting '{}'",
                greeting
            )));
        }
        tracing::info!(addr = %config.addr, greeting = %greeting, "Connected to MPD");

        session.command("consume 1").await?;
        Ok(session)
    }

    async fn read_line(&mut self) -> BackendResult<String> {
        let mut line = String::new();
        let read = tokio::time::timeout(self.timeout, self.stream.read_line(&mut line))
            .await
            .map_err(|_| BackendError::Unavailable("MPD read timed out".to_string()))??;
        if read == 0 {
            return Err(BackendError::Unavailable("MPD closed the connection".to_string()));
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    async fn write_command(&mut self, command: &str) -> BackendResult<()> {
        tracing::trace!(command = %command, "MPD command");
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn command(&mut self, command: &str) -> Result<Pairs, CommandError> {
        self.write_command(command).await?;

        let mut pairs = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == "OK" {
                return Ok(pairs);
            }
            if let Some(ack) = Ack::parse(&line) {
                return Err(CommandError::Ack(ack));
            }
            pairs.push(protocol::parse_pair(&line)?);
        }
    }
}

/// Error from one command; ACKs are kept apart so callers can match on codes
#[derive(Debug)]
enum CommandError {
    Ack(Ack),
    Backend(BackendError),
}

impl From<CommandError> for BackendError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Ack(ack) => ack.into_error(),
            CommandError::Backend(e) => e,
        }
    }
}

impl From<BackendError> for CommandError {
    fn from(err: BackendError) -> Self {
        CommandError::Backend(err)
    }
}

enum Request {
    Command {
        command: String,
        reply: oneshot::Sender<Result<Pairs, CommandError>>,
    },
    Reconnect {
        reply: oneshot::Sender<BackendResult<()>>,
    },
}

/// Actor loop owning the session
async fn run_connection(config: MpdConfig, mut requests: mpsc::Receiver<Request>) {
    let mut session: Option<Session> = None;

    while let Some(request) = requests.recv().await {
        match request {
            Request::Command { command, reply } => {
                let result = run_command(&config, &mut session, &command).await;
                let _ = reply.send(result);
            }
            Request::Reconnect { reply } => {
                session = None;
                let result = match Session::open(&config).await {
                    Ok(fresh) => {
                        session = Some(fresh);
                        Ok(())
                    }
                    Err(e) => {
                        tracing::warn!(addr = %config.addr, error = %e, "MPD reconnect failed");
                        Err(e)
                    }
                };
                let _ = reply.send(result);
            }
        }
    }

    tracing::debug!("MPD connection actor stopped");
}

async fn run_command(
    config: &MpdConfig,
    session: &mut Option<Session>,
    command: &str,
) -> Result<Pairs, CommandError> {
    if session.is_none() {
        *session = Some(Session::open(config).await?);
    }
    let Some(active) = session.as_mut() else {
        return Err(BackendError::Unavailable("no MPD session".to_string()).into());
    };

    match active.command(command).await {
        Err(CommandError::Backend(e)) => {
            // Only ACKs leave the session usable
            *session = None;
            Err(CommandError::Backend(e))
        }
        other => other,
    }
}

/// MPD-backed player
pub struct MpdBackend {
    requests: mpsc::Sender<Request>,
    music_dir: PathBuf,
}

impl MpdBackend {
    /// Spawn the connection actor; the connection itself opens on first use
    pub fn new(config: MpdConfig) -> Self {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let music_dir = config.music_dir.clone();
        tokio::spawn(run_connection(config, rx));
        Self {
            requests: tx,
            music_dir,
        }
    }

    async fn raw(&self, command: String) -> Result<Pairs, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| BackendError::Unavailable("MPD actor stopped".to_string()))?;
        rx.await
            .map_err(|_| BackendError::Unavailable("MPD actor dropped the request".to_string()))?
    }

    async fn command(&self, command: impl Into<String>) -> BackendResult<Pairs> {
        Ok(self.raw(command.into()).await?)
    }

    async fn mpd_status(&self) -> BackendResult<MpdStatus> {
        MpdStatus::parse(&self.command("status").await?)
    }

    /// Metadata musebot stored when it queued `file`, if any
    async fn stored_track(&self, file: &str) -> Option<TrackRef> {
        let file_arg = match quote(file) {
            Ok(arg) => arg,
            Err(e) => {
                tracing::debug!(file = %file, error = %e, "Skipping sticker lookup");
                return None;
            }
        };
        match self
            .raw(format!("sticker get song {} songinfo", file_arg))
            .await
        {
            Ok(pairs) => protocol::parse_songinfo_sticker(&pairs),
            Err(CommandError::Ack(_)) => None,
            Err(CommandError::Backend(e)) => {
                tracing::debug!(file = %file, error = %e, "Sticker lookup failed");
                None
            }
        }
    }

    async fn to_queued(&self, song: MpdSong) -> QueuedTrack {
        let stored = self.stored_track(&song.file).await;
        song.into_queued(&self.music_dir, stored)
    }

    /// Path relative to the music directory, linking files that live elsewhere
    async fn library_uri(&self, path: &Path) -> BackendResult<String> {
        if !path.is_absolute() {
            return Err(BackendError::InvalidTrack(format!(
                "path '{}' is not absolute",
                path.display()
            )));
        }

        let in_library = if path.starts_with(&self.music_dir) {
            path.to_path_buf()
        } else {
            let link = self.music_dir.join(link_name(path));
            match tokio::fs::symlink(path, &link).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
            link
        };

        let relative = in_library
            .strip_prefix(&self.music_dir)
            .map_err(|_| BackendError::InvalidTrack(format!("'{}' escapes the music directory", path.display())))?;
        relative
            .to_str()
            .map(|s| s.trim_start_matches('/').to_string())
            .ok_or_else(|| BackendError::InvalidTrack("path is not valid UTF-8".to_string()))
    }

    /// `addid`, retried while MPD's database update picks the file up
    async fn add_when_indexed(&self, uri: &str) -> BackendResult<u64> {
        let command = format!("addid {}", quote(uri)?);
        let mut attempt = 0;
        loop {
            match self.raw(command.clone()).await {
                Ok(pairs) => {
                    return pairs
                        .iter()
                        .find(|(k, _)| k == "Id")
                        .and_then(|(_, v)| v.parse().ok())
                        .ok_or_else(|| BackendError::Protocol("addid returned no Id".to_string()));
                }
                Err(CommandError::Ack(ack)) if ack.code == ACK_NO_EXIST && attempt < INDEX_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(INDEX_RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// `zz_<sha256 of path>.<ext>`; the prefix sorts links after real library files
fn link_name(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("zz_{}.{}", hash, ext),
        None => format!("zz_{}", hash),
    }
}

#[async_trait]
impl PlaybackBackend for MpdBackend {
    fn name(&self) -> &'static str {
        "mpd"
    }

    async fn status(&self) -> BackendResult<BackendStatus> {
        Ok(self.mpd_status().await?.to_backend_status())
    }

    async fn playback_queue(&self) -> BackendResult<Vec<QueuedTrack>> {
        let status = self.mpd_status().await?;
        let start = if status.state.has_current_track() {
            status.song_pos.unwrap_or(0)
        } else {
            0
        };
        if start >= status.playlist_length {
            return Ok(Vec::new());
        }

        let pairs = self
            .command(format!("playlistinfo {}:{}", start, status.playlist_length))
            .await?;
        let mut queue = Vec::new();
        for song in MpdSong::parse_list(&pairs)? {
            queue.push(self.to_queued(song).await);
        }
        Ok(queue)
    }

    async fn current_track(&self) -> BackendResult<Option<CurrentTrack>> {
        let status = self.mpd_status().await?;
        if !status.state.has_current_track() {
            return Ok(None);
        }

        let pairs = self.command("currentsong").await?;
        let Some(song) = MpdSong::parse_list(&pairs)?.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(CurrentTrack {
            entry: self.to_queued(song).await,
            state: status.state,
            position_secs: status.elapsed_secs.unwrap_or(0.0),
        }))
    }

    async fn add(&self, track: &TrackRef) -> BackendResult<()> {
        let path = track.local_path.as_deref().ok_or_else(|| {
            BackendError::InvalidTrack(format!("{} has not been fetched", track.label()))
        })?;

        let uri = self.library_uri(path).await?;
        let uri_arg = quote(&uri)?;

        // A stopped player in consume mode only holds leftovers
        if !self.mpd_status().await?.state.has_current_track() {
            self.command("clear").await?;
        }

        self.command(format!("update {}", uri_arg)).await?;
        let id = self.add_when_indexed(&uri).await?;

        let mut stored = track.clone();
        stored.local_path = None;
        match serde_json::to_string(&stored) {
            Ok(json) => {
                if let Err(e) = self
                    .command(format!(
                        "sticker set song {} songinfo {}",
                        uri_arg,
                        quote(&json)?
                    ))
                    .await
                {
                    tracing::warn!(uri = %uri, error = %e, "Failed to store track metadata sticker");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode track metadata"),
        }

        self.command("play").await?;
        tracing::info!(id, uri = %uri, track = %track.label(), "Queued track on MPD");
        Ok(())
    }

    async fn remove(&self, id: u64) -> BackendResult<()> {
        match self.raw(format!("deleteid {}", id)).await {
            Ok(_) => Ok(()),
            Err(CommandError::Ack(ack)) if ack.code == ACK_NO_EXIST => {
                Err(BackendError::EntryNotFound(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reconnect(&self) -> BackendResult<()> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Reconnect { reply })
            .await
            .map_err(|_| BackendError::Unavailable("MPD actor stopped".to_string()))?;
        rx.await
            .map_err(|_| BackendError::Unavailable("MPD actor dropped the request".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_name_is_stable() {
        let a = link_name(Path::new("/var/cache/musebot/42.mp3"));
        let b = link_name(Path::new("/var/cache/musebot/42.mp3"));
        assert_eq!(a, b);
        assert!(a.starts_with("zz_"));
        assert!(a.ends_with(".mp3"));
        assert_eq!(a.len(), "zz_".len() + 64 + ".mp3".len());
        assert_ne!(a, link_name(Path::new("/var/cache/musebot/43.mp3")));
    }

    #[tokio::test]
    async fn test_library_uri_inside_music_dir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MpdBackend::new(MpdConfig::new("127.0.0.1:1", dir.path()));
        let file = dir.path().join("albums/song.mp3");
        assert_eq!(backend.library_uri(&file).await.unwrap(), "albums/song.mp3");
    }

    #[tokio::test]
    async fn test_library_uri_links_outside_files() {
        let music = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let file = cache.path().join("7.ogg");
        tokio::fs::write(&file, b"audio").await.unwrap();

        let backend = MpdBackend::new(MpdConfig::new("127.0.0.1:1", music.path()));
        let uri = backend.library_uri(&file).await.unwrap();
        assert_eq!(uri, link_name(&file));

        let link = music.path().join(&uri);
        assert_eq!(tokio::fs::read(&link).await.unwrap(), b"audio");

        // Linking again is a no-op
        assert_eq!(backend.library_uri(&file).await.unwrap(), uri);
    }

    #[tokio::test]
    async fn test_library_uri_rejects_relative_paths() {
        let backend = MpdBackend::new(MpdConfig::new("127.0.0.1:1", "/music"));
        assert!(matches!(
            backend.library_uri(Path::new("song.mp3")).await,
            Err(BackendError::InvalidTrack(_))
        ));
    }
}
