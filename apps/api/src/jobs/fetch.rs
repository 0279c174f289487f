//! Running fetches as progress streams

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::progress::{ProgressMessage, ProgressSender};
use crate::models::TrackRef;
use crate::provider::{CatalogProvider, ProviderError, ProviderResult};

/// Buffered progress messages per fetch
const PROGRESS_BUFFER: usize = 64;

/// Read half of a running fetch
///
/// Yields the provider's progress messages in order, then exactly one
/// terminal message built from the fetch result, then `None` forever.
pub struct FetchStream {
    rx: mpsc::Receiver<ProgressMessage>,
    task: Option<JoinHandle<ProviderResult<TrackRef>>>,
    outcome: Option<ProviderResult<TrackRef>>,
}

impl FetchStream {
    /// Start `provider.fetch(track)` on its own task
    pub fn spawn(provider: Arc<dyn CatalogProvider>, track: TrackRef) -> Self {
        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        let progress = ProgressSender::new(tx);
        let task = tokio::spawn(async move { provider.fetch(track, progress).await });

        Self {
            rx,
            task: Some(task),
            outcome: None,
        }
    }

    /// Next progress message
    pub async fn next(&mut self) -> Option<ProgressMessage> {
        if let Some(message) = self.rx.recv().await {
            return Some(message);
        }

        // All senders are gone, so the fetch has returned (or died).
        let task = self.task.take()?;
        let outcome = task
            .await
            .unwrap_or_else(|e| Err(ProviderError::TaskFailed(e.to_string())));

        let terminal = match &outcome {
            Ok(_) => ProgressMessage::Done,
            Err(e) => ProgressMessage::Error {
                cause: e.to_string(),
            },
        };
        self.outcome = Some(outcome);
        Some(terminal)
    }

    /// Drain the remaining messages and return the fetch result
    pub async fn finish(&mut self) -> ProviderResult<TrackRef> {
        while self.next().await.is_some() {}
        self.take_outcome()
            .unwrap_or_else(|| Err(ProviderError::TaskFailed("fetch outcome already taken".to_string())))
    }

    /// The fetch result, available once the terminal message was yielded
    pub fn take_outcome(&mut self) -> Option<ProviderResult<TrackRef>> {
        self.outcome.take()
    }
}
