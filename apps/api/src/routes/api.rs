//! Queue and search REST route handlers
//!
//! All routes require a bearer token.
//! - `GET /api/current_song` - Now playing, `null` when stopped
//! - `GET /api/playback_queue` - Upcoming queue
//! - `DELETE /api/playback_queue/:id` - Remove a queue entry
//! - `GET /api/search?q=&provider=` - Search a provider (default provider if omitted)
//! - `GET /api/search_and_queue_first?q=` - Queue the default provider's top match
//! - `GET /api/available_providers` - Configured providers
//! - `POST /api/add_to_queue` - Fetch and queue `{provider, provider_id}`

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::backend::PlaybackBackend;
use crate::error::{ApiError, ApiResult};
use crate::jobs::{Pipeline, QueueOutcome};
use crate::middleware::AuthUser;
use crate::models::{CurrentTrack, QueuedTrack, TrackRef};
use crate::provider::ProviderInfo;

/// Shared state for queue handlers
#[derive(Clone)]
pub struct QueueState {
    pub pipeline: Pipeline,
    pub backend: Arc<dyn PlaybackBackend>,
}

impl QueueState {
    pub fn new(pipeline: Pipeline, backend: Arc<dyn PlaybackBackend>) -> Self {
        Self { pipeline, backend }
    }
}

/// Create the queue/search router
pub fn queue_router(state: QueueState) -> Router {
    Router::new()
        .route("/current_song", get(current_song))
        .route("/playback_queue", get(playback_queue))
        .route("/playback_queue/:id", delete(remove_from_queue))
        .route("/search", get(search))
        .route("/search_and_queue_first", get(search_and_queue_first))
        .route("/available_providers", get(available_providers))
        .route("/add_to_queue", post(add_to_queue))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

impl SearchParams {
    fn query(&self) -> ApiResult<&str> {
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Ok(q),
            _ => Err(ApiError::ValidationError(
                "query parameter 'q' is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddToQueueRequest {
    pub provider: String,
    pub provider_id: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentSong {
    #[serde(flatten)]
    pub current: CurrentTrack,
    /// Elapsed fraction in `0.0..=1.0`
    pub percent_position: f64,
}

impl IntoResponse for QueueOutcome {
    fn into_response(self) -> Response {
        let status = match self {
            QueueOutcome::Queued { .. } => StatusCode::OK,
            QueueOutcome::JobAccepted { .. } => StatusCode::ACCEPTED,
        };
        (status, Json(self)).into_response()
    }
}

async fn current_song(
    State(state): State<QueueState>,
    _auth: AuthUser,
) -> ApiResult<Json<Option<CurrentSong>>> {
    let current = state.backend.current_track().await?;
    Ok(Json(current.map(|current| CurrentSong {
        percent_position: current.percent_position(),
        current,
    })))
}

async fn playback_queue(
    State(state): State<QueueState>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<QueuedTrack>>> {
    Ok(Json(state.backend.playback_queue().await?))
}

async fn remove_from_queue(
    State(state): State<QueueState>,
    auth: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.backend.remove(id).await?;
    tracing::info!(user = %auth.user.username, id, "Queue entry removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn search(
    State(state): State<QueueState>,
    _auth: AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<TrackRef>>> {
    let query = params.query()?;
    let results = state
        .pipeline
        .search(query, params.provider.as_deref())
        .await?;
    Ok(Json(results))
}

async fn search_and_queue_first(
    State(state): State<QueueState>,
    auth: AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<QueueOutcome> {
    let query = params.query()?;
    tracing::debug!(user = %auth.user.username, query = %query, "search_and_queue_first");
    state.pipeline.search_and_queue_first(query).await
}

async fn available_providers(
    State(state): State<QueueState>,
    _auth: AuthUser,
) -> Json<Vec<ProviderInfo>> {
    Json(state.pipeline.providers().available())
}

async fn add_to_queue(
    State(state): State<QueueState>,
    auth: AuthUser,
    Json(request): Json<AddToQueueRequest>,
) -> ApiResult<QueueOutcome> {
    if request.provider_id.is_empty() {
        return Err(ApiError::ValidationError(
            "provider_id cannot be empty".to_string(),
        ));
    }
    let track = TrackRef::new(request.provider, request.provider_id);
    state
        .pipeline
        .add_to_queue(track, &auth.user.username)
        .await
}
