//! Progress messages emitted while a provider fetches a track
//!
//! A fetch reports zero or more non-terminal messages followed by exactly one
//! terminal message (`done` or `error`). Providers only get a
//! [`ProgressSender`], which cannot produce terminal messages; the terminal is
//! synthesized from the fetch result by [`FetchStream`](super::FetchStream).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::id::JobId;

/// One unit of a fetch's progress stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProgressMessage {
    /// Total number of stages; `0` means the track is available immediately
    Stages(u32),
    /// 1-based index of the stage now running
    CurrentStage(u32),
    CurrentStageDescription(String),
    /// Total byte length of the current transfer
    Length(u64),
    /// Cumulative bytes transferred so far
    Downloaded(u64),
    Done,
    Error { cause: String },
}

impl ProgressMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stages(_) => "stages",
            Self::CurrentStage(_) => "current_stage",
            Self::CurrentStageDescription(_) => "current_stage_description",
            Self::Length(_) => "length",
            Self::Downloaded(_) => "downloaded",
            Self::Done => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Job-scoped progress as it goes out on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    pub job_id: String,
    pub data: ProgressMessage,
}

impl JobData {
    pub fn new(job_id: JobId, data: ProgressMessage) -> Self {
        Self {
            job_id: job_id.to_string(),
            data,
        }
    }
}

/// Write half handed to a provider's `fetch`
///
/// Sends wait for buffer space, never drop, and never fail loudly: once the
/// reading side is gone the provider keeps running and its progress is discarded.
#[derive(Debug)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressMessage>,
}

impl ProgressSender {
    pub(crate) fn new(tx: mpsc::Sender<ProgressMessage>) -> Self {
        Self { tx }
    }

    async fn send(&self, message: ProgressMessage) {
        if self.tx.send(message).await.is_err() {
            tracing::trace!("Progress receiver gone, discarding message");
        }
    }

    pub async fn stages(&self, count: u32) {
        self.send(ProgressMessage::Stages(count)).await;
    }

    pub async fn current_stage(&self, stage: u32) {
        self.send(ProgressMessage::CurrentStage(stage)).await;
    }

    pub async fn current_stage_description(&self, description: impl Into<String>) {
        self.send(ProgressMessage::CurrentStageDescription(description.into()))
            .await;
    }

    pub async fn length(&self, bytes: u64) {
        self.send(ProgressMessage::Length(bytes)).await;
    }

    pub async fn downloaded(&self, bytes: u64) {
        self.send(ProgressMessage::Downloaded(bytes)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(ProgressMessage::Stages(2)).unwrap(),
            json!({"type": "stages", "payload": 2})
        );
        assert_eq!(
            serde_json::to_value(ProgressMessage::CurrentStageDescription(
                "Downloading file...".to_string()
            ))
            .unwrap(),
            json!({"type": "current_stage_description", "payload": "Downloading file..."})
        );
        assert_eq!(
            serde_json::to_value(ProgressMessage::Done).unwrap(),
            json!({"type": "done"})
        );
        assert_eq!(
            serde_json::to_value(ProgressMessage::Error {
                cause: "boom".to_string()
            })
            .unwrap(),
            json!({"type": "error", "payload": {"cause": "boom"}})
        );
    }

    #[test]
    fn test_job_data_uses_string_id() {
        let ids = crate::jobs::JobIdAllocator::new();
        let data = JobData::new(ids.next(), ProgressMessage::Downloaded(512));
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"job_id": "1", "data": {"type": "downloaded", "payload": 512}})
        );
    }

    #[test]
    fn test_terminal_messages() {
        assert!(ProgressMessage::Done.is_terminal());
        assert!(ProgressMessage::Error {
            cause: String::new()
        }
        .is_terminal());
        assert!(!ProgressMessage::Stages(0).is_terminal());
        assert!(!ProgressMessage::Downloaded(1).is_terminal());
    }

    #[tokio::test]
    async fn test_sender_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel(1);
        let sender = ProgressSender::new(tx);
        drop(rx);
        sender.stages(1).await;
        sender.downloaded(10).await;
    }
}
