//! MPD backend against a scripted fake server

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use musebot_api::backend::{BackendError, MpdBackend, PlaybackBackend};
use musebot_api::models::{PlaybackState, TrackRef};
use musebot_shared_config::MpdConfig;

type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Accepts any number of connections; an empty reply closes the connection
struct FakeMpd {
    addr: String,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeMpd {
    async fn start(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let respond: Responder = Arc::new(respond);

        let recorded = commands.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    let (read, mut write) = socket.into_split();
                    if write.write_all(b"OK MPD 0.23.5\n").await.is_err() {
                        return;
                    }
                    let mut lines = BufReader::new(read).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        recorded.lock().unwrap().push(line.clone());
                        let reply = respond(&line);
                        if reply.is_empty() || write.write_all(reply.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        Self { addr, commands }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

fn ok(body: &str) -> String {
    if body.is_empty() {
        "OK\n".to_string()
    } else {
        format!("{}\nOK\n", body)
    }
}

fn ack(code: u32, command: &str, message: &str) -> String {
    format!("ACK [{}@0] {{{}}} {}\n", code, command, message)
}

const PLAYING: &str = "volume: 80\nstate: play\nplaylist: 7\nplaylistlength: 2\nsong: 0\nelapsed: 30.000";
const STOPPED: &str = "volume: 80\nstate: stop\nplaylist: 3\nplaylistlength: 0";

fn player(command: &str) -> String {
    match command {
        "status" => ok(PLAYING),
        "playlistinfo 0:2" | "currentsong" => ok(
            "file: rock/one.mp3\nTitle: One\nArtist: Band\nTime: 120\nPos: 0\nId: 4\n\
             file: rock/two.mp3\nTitle: Two\nArtist: Band\nTime: 90\nPos: 1\nId: 5",
        ),
        cmd if cmd.starts_with("sticker get") => ack(50, "sticker", "no such sticker"),
        "deleteid 9" => ack(50, "deleteid", "No such song"),
        _ => ok(""),
    }
}

#[tokio::test]
async fn test_status_enables_consume_mode() {
    let server = FakeMpd::start(player).await;
    let backend = MpdBackend::new(MpdConfig::new(&server.addr, "/srv/music"));

    let status = backend.status().await.unwrap();
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(status.playlist_version, 7);
    assert_eq!(server.commands(), vec!["consume 1", "status"]);
}

#[tokio::test]
async fn test_queue_and_current_song_use_file_tags() {
    let server = FakeMpd::start(player).await;
    let backend = MpdBackend::new(MpdConfig::new(&server.addr, "/srv/music"));

    let queue = backend.playback_queue().await.unwrap();
    let ids: Vec<_> = queue.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![4, 5]);
    assert_eq!(queue[0].track.provider, "local");
    assert_eq!(queue[0].track.title, "One");
    assert_eq!(queue[0].track.length_secs, 120);
    assert_eq!(
        queue[0].track.local_path.as_deref(),
        Some(std::path::Path::new("/srv/music/rock/one.mp3"))
    );

    let current = backend.current_track().await.unwrap().unwrap();
    assert_eq!(current.entry.id, 4);
    assert_eq!(current.position_secs, 30.0);
    assert_eq!(current.percent_position(), 0.25);
}

#[tokio::test]
async fn test_remove_unknown_entry() {
    let server = FakeMpd::start(player).await;
    let backend = MpdBackend::new(MpdConfig::new(&server.addr, "/srv/music"));

    assert_matches!(backend.remove(9).await, Err(BackendError::EntryNotFound(9)));
    assert!(backend.remove(4).await.is_ok());
    assert!(server.commands().contains(&"deleteid 4".to_string()));
}

#[tokio::test]
async fn test_add_to_stopped_player() {
    let music = tempfile::tempdir().unwrap();
    let music_dir = music.path().to_path_buf();
    let addid_calls = Arc::new(AtomicUsize::new(0));

    let calls = addid_calls.clone();
    let server = FakeMpd::start(move |command| match command {
        "status" => ok(STOPPED),
        cmd if cmd.starts_with("update") => ok("updating_db: 1"),
        // Not indexed yet on the first attempt
        cmd if cmd.starts_with("addid") => {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                ack(50, "addid", "No such directory")
            } else {
                ok("Id: 12")
            }
        }
        _ => ok(""),
    })
    .await;
    let backend = MpdBackend::new(MpdConfig::new(&server.addr, &music_dir));

    let mut track = TrackRef::new("catalog", "42").with_metadata("Song", "Artist", "Album");
    track.local_path = Some(music_dir.join("catalog/42.mp3"));
    backend.add(&track).await.unwrap();

    let commands = server.commands();
    assert_eq!(
        &commands[..5],
        &[
            "consume 1",
            "status",
            "clear",
            "update \"catalog/42.mp3\"",
            "addid \"catalog/42.mp3\"",
        ]
    );
    assert_eq!(addid_calls.load(Ordering::SeqCst), 2);

    let sticker = commands
        .iter()
        .find(|c| c.starts_with("sticker set song \"catalog/42.mp3\" songinfo"))
        .expect("metadata sticker stored");
    assert!(sticker.contains("Song"));
    assert_eq!(commands.last().map(String::as_str), Some("play"));
}

#[tokio::test]
async fn test_add_rejects_unfetched_track() {
    let server = FakeMpd::start(player).await;
    let backend = MpdBackend::new(MpdConfig::new(&server.addr, "/srv/music"));

    let track = TrackRef::new("catalog", "42");
    assert_matches!(backend.add(&track).await, Err(BackendError::InvalidTrack(_)));
    assert!(server.commands().is_empty());
}

#[tokio::test]
async fn test_add_refuses_line_break_in_path() {
    let server = FakeMpd::start(player).await;
    let backend = MpdBackend::new(MpdConfig::new(&server.addr, "/srv/music"));

    let mut track = TrackRef::new("catalog", "42");
    track.local_path = Some("/srv/music/catalog/42.mp3\nclear".into());
    assert_matches!(backend.add(&track).await, Err(BackendError::InvalidTrack(_)));
    assert!(!server.commands().iter().any(|c| c.starts_with("update") || c == "clear"));
}

#[tokio::test]
async fn test_dropped_connection_reopens() {
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = polls.clone();
    let server = FakeMpd::start(move |command| match command {
        "status" if seen.fetch_add(1, Ordering::SeqCst) == 0 => String::new(),
        "status" => ok(PLAYING),
        _ => ok(""),
    })
    .await;
    let backend = MpdBackend::new(MpdConfig::new(&server.addr, "/srv/music"));

    assert_matches!(backend.status().await, Err(BackendError::Unavailable(_)));
    assert!(backend.status().await.is_ok());

    let consumes = server
        .commands()
        .iter()
        .filter(|c| c.as_str() == "consume 1")
        .count();
    assert_eq!(consumes, 2);
}

#[tokio::test]
async fn test_unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let backend = MpdBackend::new(MpdConfig::new(addr, "/srv/music"));
    assert!(backend.status().await.is_err());
    assert!(backend.reconnect().await.is_err());
}
