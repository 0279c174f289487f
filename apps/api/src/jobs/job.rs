//! Job bookkeeping for one fetch-then-enqueue operation

use serde::Serialize;

use super::id::JobId;
use super::progress::ProgressMessage;
use crate::models::TrackRef;

/// Lifecycle of a job; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Submitted,
    Fetching,
    /// Accepted as a background job, waiting for the terminal message
    AwaitingStages,
    Queued,
    Failed,
}

impl JobStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Queued | Self::Failed)
    }
}

/// A single fetch job, owned by the task that drives it
#[derive(Debug, Clone)]
pub struct Job {
    /// Assigned when the job is accepted as a background job
    pub id: Option<JobId>,
    pub user: String,
    pub track: TrackRef,
    stage: JobStage,
}

impl Job {
    pub fn new(user: impl Into<String>, track: TrackRef) -> Self {
        Self {
            id: None,
            user: user.into(),
            track,
            stage: JobStage::Submitted,
        }
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    /// Move to `next`; returns false (and stays put) on a backwards or post-terminal move
    pub fn advance(&mut self, next: JobStage) -> bool {
        if self.stage.is_terminal() || next <= self.stage {
            return false;
        }
        self.stage = next;
        true
    }

    /// Accept as a background job under `id`
    pub fn accept(&mut self, id: JobId) -> bool {
        if self.id.is_some() || !self.advance(JobStage::AwaitingStages) {
            return false;
        }
        self.id = Some(id);
        true
    }

    /// Feed a progress message; returns false when the job already finished
    ///
    /// Terminal messages move the job to `Queued` or `Failed`.
    pub fn observe(&mut self, message: &ProgressMessage) -> bool {
        if self.stage.is_terminal() {
            return false;
        }
        match message {
            ProgressMessage::Done => self.advance(JobStage::Queued),
            ProgressMessage::Error { .. } => self.advance(JobStage::Failed),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new("alice", TrackRef::new("catalog", "1"))
    }

    #[test]
    fn test_background_lifecycle() {
        let ids = crate::jobs::JobIdAllocator::new();
        let mut job = job();
        assert_eq!(job.stage(), JobStage::Submitted);
        assert!(job.advance(JobStage::Fetching));
        assert!(job.accept(ids.next()));
        assert_eq!(job.stage(), JobStage::AwaitingStages);
        assert!(job.observe(&ProgressMessage::CurrentStage(1)));
        assert!(job.observe(&ProgressMessage::Done));
        assert_eq!(job.stage(), JobStage::Queued);
    }

    #[test]
    fn test_stage_zero_fast_path() {
        let mut job = job();
        assert!(job.advance(JobStage::Fetching));
        assert!(job.advance(JobStage::Queued));
        assert!(job.id.is_none());
    }

    #[test]
    fn test_stage_never_regresses() {
        let mut job = job();
        job.advance(JobStage::Fetching);
        job.advance(JobStage::AwaitingStages);
        assert!(!job.advance(JobStage::Fetching));
        assert!(!job.advance(JobStage::Submitted));
        assert_eq!(job.stage(), JobStage::AwaitingStages);
    }

    #[test]
    fn test_terminal_rejects_further_messages() {
        let mut job = job();
        job.advance(JobStage::Fetching);
        assert!(job.observe(&ProgressMessage::Error {
            cause: "gone".to_string()
        }));
        assert_eq!(job.stage(), JobStage::Failed);
        assert!(!job.observe(&ProgressMessage::Done));
        assert!(!job.observe(&ProgressMessage::Downloaded(5)));
        assert!(!job.advance(JobStage::Queued));
        assert_eq!(job.stage(), JobStage::Failed);
    }

    #[test]
    fn test_accept_only_once() {
        let ids = crate::jobs::JobIdAllocator::new();
        let mut job = job();
        job.advance(JobStage::Fetching);
        assert!(job.accept(ids.next()));
        assert!(!job.accept(ids.next()));
        assert_eq!(job.id.map(|id| id.get()), Some(1));
    }
}
