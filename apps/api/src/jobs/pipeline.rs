//! Fetch-and-queue pipeline
//!
//! `add_to_queue` answers as soon as the first `stages` message arrives: a
//! zero-stage fetch is queued inline, anything longer becomes a background
//! job whose progress goes to the requesting user's connections.

use std::sync::Arc;

use serde::Serialize;

use super::fetch::FetchStream;
use super::id::{JobId, JobIdAllocator};
use super::job::{Job, JobStage};
use super::progress::{JobData, ProgressMessage};
use crate::backend::PlaybackBackend;
use crate::error::{ApiError, ApiResult};
use crate::models::TrackRef;
use crate::provider::{CatalogProvider, ProviderError, ProviderRegistry, ProviderResult};
use crate::websocket::{HubHandle, ServerMessage};

/// What happened to a queue request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueueOutcome {
    /// The track is on the backend's queue
    Queued { track: TrackRef },
    /// The fetch continues in the background; watch `job_data` for this id
    JobAccepted { job_id: JobId },
}

#[derive(Clone)]
pub struct Pipeline {
    providers: Arc<ProviderRegistry>,
    backend: Arc<dyn PlaybackBackend>,
    hub: HubHandle,
    ids: Arc<JobIdAllocator>,
}

impl Pipeline {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        backend: Arc<dyn PlaybackBackend>,
        hub: HubHandle,
    ) -> Self {
        Self {
            providers,
            backend,
            hub,
            ids: Arc::new(JobIdAllocator::new()),
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    fn provider(&self, name: Option<&str>) -> ApiResult<Arc<dyn CatalogProvider>> {
        match name {
            Some(name) => self
                .providers
                .get(name)
                .ok_or_else(|| ApiError::not_found("provider", name)),
            None => self
                .providers
                .default_provider()
                .ok_or_else(|| ApiError::Configuration("no catalog provider configured".to_string())),
        }
    }

    /// Search one provider, the default one when `provider` is `None`
    pub async fn search(&self, query: &str, provider: Option<&str>) -> ApiResult<Vec<TrackRef>> {
        let provider = self.provider(provider)?;
        Ok(provider.search(query).await?)
    }

    /// Queue the default provider's best match for `query`
    ///
    /// Waits for the whole fetch; there is no background job on this path.
    pub async fn search_and_queue_first(&self, query: &str) -> ApiResult<QueueOutcome> {
        let provider = self.provider(None)?;
        let top = provider
            .search(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NoResults(query.to_string()))?;

        tracing::debug!(query = %query, track = %top.label(), "Queueing top search result");
        let fetched = FetchStream::spawn(provider, top).finish().await?;
        self.backend.add(&fetched).await?;

        tracing::info!(track = %fetched.label(), "Track queued");
        Ok(QueueOutcome::Queued { track: fetched })
    }

    /// Fetch `track` for `user` and queue it
    pub async fn add_to_queue(&self, track: TrackRef, user: &str) -> ApiResult<QueueOutcome> {
        let provider = self.provider(Some(&track.provider))?;
        let mut job = Job::new(user, track);

        job.track = provider.refresh_metadata(job.track.clone()).await?;
        job.advance(JobStage::Fetching);
        let mut stream = FetchStream::spawn(provider, job.track.clone());

        while let Some(message) = stream.next().await {
            match message {
                ProgressMessage::Stages(0) => {
                    let fetched = match stream.finish().await {
                        Ok(fetched) => fetched,
                        Err(e) => return Err(fail(&mut job, e)),
                    };
                    return self.enqueue_now(&mut job, fetched).await;
                }
                ProgressMessage::Stages(stages) => {
                    let id = self.ids.next();
                    job.accept(id);
                    tracing::info!(
                        job_id = %id,
                        user = %job.user,
                        track = %job.track.label(),
                        stages,
                        "Fetch job accepted"
                    );
                    tokio::spawn(self.clone().drive(job, stream, message));
                    return Ok(QueueOutcome::JobAccepted { job_id: id });
                }
                ProgressMessage::Done => {
                    let fetched = take_outcome(&mut stream)?;
                    return self.enqueue_now(&mut job, fetched).await;
                }
                ProgressMessage::Error { .. } => {
                    let err = match take_outcome(&mut stream) {
                        Ok(_) => ProviderError::TaskFailed("error without a cause".to_string()),
                        Err(e) => e,
                    };
                    return Err(fail(&mut job, err));
                }
                other => {
                    tracing::trace!(kind = other.kind(), "Progress before stage count dropped");
                }
            }
        }

        Err(fail(
            &mut job,
            ProviderError::TaskFailed("fetch ended without a terminal message".to_string()),
        ))
    }

    async fn enqueue_now(&self, job: &mut Job, fetched: TrackRef) -> ApiResult<QueueOutcome> {
        self.backend.add(&fetched).await?;
        job.advance(JobStage::Queued);
        tracing::info!(user = %job.user, track = %fetched.label(), "Track queued");
        Ok(QueueOutcome::Queued { track: fetched })
    }

    /// Drain a background job, forwarding every message to its user
    async fn drive(self, mut job: Job, mut stream: FetchStream, first: ProgressMessage) {
        let Some(id) = job.id else {
            return;
        };

        self.publish(id, &job.user, first).await;

        while let Some(message) = stream.next().await {
            if !job.observe(&message) {
                tracing::debug!(job_id = %id, kind = message.kind(), "Message after terminal ignored");
                continue;
            }

            match &message {
                ProgressMessage::Done => {
                    if let Some(Ok(fetched)) = stream.take_outcome() {
                        // Fire-and-forget: the job is done even if the player refuses it
                        match self.backend.add(&fetched).await {
                            Ok(()) => {
                                tracing::info!(job_id = %id, track = %fetched.label(), "Track queued")
                            }
                            Err(e) => {
                                tracing::error!(job_id = %id, error = %e, "Backend add failed")
                            }
                        }
                    }
                }
                ProgressMessage::Error { cause } => {
                    tracing::warn!(job_id = %id, user = %job.user, cause = %cause, "Fetch job failed");
                }
                _ => {}
            }

            self.publish(id, &job.user, message).await;
        }
    }

    async fn publish(&self, id: JobId, user: &str, message: ProgressMessage) {
        self.hub
            .broadcast_to_user(user, ServerMessage::JobData(JobData::new(id, message)))
            .await;
    }
}

fn take_outcome(stream: &mut FetchStream) -> ProviderResult<TrackRef> {
    stream
        .take_outcome()
        .unwrap_or_else(|| Err(ProviderError::TaskFailed("fetch outcome missing".to_string())))
}

fn fail(job: &mut Job, err: ProviderError) -> ApiError {
    job.advance(JobStage::Failed);
    tracing::warn!(user = %job.user, track = %job.track.label(), error = %err, "Fetch failed");
    ApiError::Provider(err)
}
