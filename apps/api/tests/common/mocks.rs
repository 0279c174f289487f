//! Scriptable provider and backend fakes

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use musebot_api::backend::{BackendError, BackendResult, PlaybackBackend};
use musebot_api::jobs::ProgressSender;
use musebot_api::models::{BackendStatus, CurrentTrack, PlaybackState, QueuedTrack, TrackRef};
use musebot_api::provider::{CatalogProvider, ProviderError, ProviderResult};

/// One scripted action of a fetch
#[derive(Clone)]
pub enum Step {
    Stages(u32),
    CurrentStage(u32),
    Description(&'static str),
    Length(u64),
    Downloaded(u64),
    /// Block until the notify fires
    Wait(Arc<Notify>),
}

/// Provider that replays a fixed script on every fetch
pub struct ScriptedProvider {
    name: String,
    steps: Vec<Step>,
    failure: Option<String>,
    results: Vec<TrackRef>,
    fetches: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps,
            failure: None,
            results: Vec::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// End every fetch with an error after the script ran
    pub fn failing(mut self, cause: &str) -> Self {
        self.failure = Some(cause.to_string());
        self
    }

    pub fn with_results(mut self, ids: &[&str]) -> Self {
        self.results = ids
            .iter()
            .map(|id| TrackRef::new(self.name.clone(), *id).with_metadata(*id, "Scripted", "Album"))
            .collect();
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }

    async fn search(&self, _query: &str) -> ProviderResult<Vec<TrackRef>> {
        Ok(self.results.clone())
    }

    async fn refresh_metadata(&self, track: TrackRef) -> ProviderResult<TrackRef> {
        let title = format!("Title {}", track.provider_id);
        Ok(track.with_metadata(title, "Scripted", "Album"))
    }

    async fn fetch(&self, track: TrackRef, progress: ProgressSender) -> ProviderResult<TrackRef> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        for step in &self.steps {
            match step {
                Step::Stages(n) => progress.stages(*n).await,
                Step::CurrentStage(n) => progress.current_stage(*n).await,
                Step::Description(d) => progress.current_stage_description(*d).await,
                Step::Length(n) => progress.length(*n).await,
                Step::Downloaded(n) => progress.downloaded(*n).await,
                Step::Wait(gate) => gate.notified().await,
            }
        }

        if let Some(cause) = &self.failure {
            return Err(ProviderError::TaskFailed(cause.clone()));
        }
        Ok(TrackRef {
            local_path: Some(PathBuf::from(format!("/cache/{}.mp3", track.provider_id))),
            ..track
        })
    }
}

#[derive(Debug, Default)]
struct ScriptedState {
    state: Option<PlaybackState>,
    playlist_version: u64,
    tracks: Vec<QueuedTrack>,
    fail_status: bool,
    fail_queue: bool,
    fail_add: bool,
    added: Vec<TrackRef>,
    reconnects: u32,
    queue_fetches: u32,
}

/// Backend whose every answer is set by the test
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    inner: Mutex<ScriptedState>,
}

pub fn entry(id: u64, name: &str) -> QueuedTrack {
    QueuedTrack {
        id,
        track: TrackRef::new("scripted", name).with_metadata(name, "Scripted", "Album"),
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut ScriptedState) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn set_state(&self, state: PlaybackState) {
        self.with(|s| s.state = Some(state));
    }

    /// Replace the queue and set the version it is reported under
    pub fn set_queue(&self, version: u64, tracks: Vec<QueuedTrack>) {
        self.with(|s| {
            s.playlist_version = version;
            s.tracks = tracks;
        });
    }

    pub fn set_version(&self, version: u64) {
        self.with(|s| s.playlist_version = version);
    }

    pub fn fail_status(&self, fail: bool) {
        self.with(|s| s.fail_status = fail);
    }

    pub fn fail_queue(&self, fail: bool) {
        self.with(|s| s.fail_queue = fail);
    }

    pub fn fail_add(&self, fail: bool) {
        self.with(|s| s.fail_add = fail);
    }

    pub fn added(&self) -> Vec<TrackRef> {
        self.with(|s| s.added.clone())
    }

    pub fn reconnects(&self) -> u32 {
        self.with(|s| s.reconnects)
    }

    pub fn queue_fetches(&self) -> u32 {
        self.with(|s| s.queue_fetches)
    }
}

#[async_trait]
impl PlaybackBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn status(&self) -> BackendResult<BackendStatus> {
        self.with(|s| {
            if s.fail_status {
                return Err(BackendError::Unavailable("scripted outage".to_string()));
            }
            Ok(BackendStatus {
                state: s.state.unwrap_or(PlaybackState::Stopped),
                playlist_version: s.playlist_version,
            })
        })
    }

    async fn playback_queue(&self) -> BackendResult<Vec<QueuedTrack>> {
        self.with(|s| {
            s.queue_fetches += 1;
            if s.fail_queue {
                return Err(BackendError::Protocol("scripted queue failure".to_string()));
            }
            Ok(s.tracks.clone())
        })
    }

    async fn current_track(&self) -> BackendResult<Option<CurrentTrack>> {
        Ok(None)
    }

    async fn add(&self, track: &TrackRef) -> BackendResult<()> {
        self.with(|s| {
            if s.fail_add {
                return Err(BackendError::Rejected {
                    command: "addid".to_string(),
                    message: "scripted refusal".to_string(),
                });
            }
            s.added.push(track.clone());
            Ok(())
        })
    }

    async fn remove(&self, id: u64) -> BackendResult<()> {
        Err(BackendError::EntryNotFound(id))
    }

    async fn reconnect(&self) -> BackendResult<()> {
        self.with(|s| s.reconnects += 1);
        Ok(())
    }
}
