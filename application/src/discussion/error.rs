//! Runtime errors for discussion workers

use crate::ports::snapshot_store::SnapshotStoreError;
use colloquy_domain::{DiscussionId, OrchestratorError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscussionRuntimeError {
    /// The orchestrator refused the operation; nothing changed.
    #[error(transparent)]
    Rejected(#[from] OrchestratorError),

    #[error("Discussion worker for {0} has stopped")]
    WorkerClosed(DiscussionId),

    #[error("Unknown discussion: {0}")]
    UnknownDiscussion(DiscussionId),

    #[error("Discussion {0} is already running")]
    DuplicateDiscussion(DiscussionId),

    #[error(transparent)]
    Snapshot(#[from] SnapshotStoreError),
}

impl DiscussionRuntimeError {
    /// The orchestrator's rejection, if that is what this is.
    pub fn rejection(&self) -> Option<&OrchestratorError> {
        match self {
            DiscussionRuntimeError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}
