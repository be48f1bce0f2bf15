//! Port for orchestrator snapshot persistence.
//!
//! Discussions survive restarts through [`OrchestratorSnapshot`]s. The store
//! keeps the latest snapshot per discussion; older ones are overwritten.

use async_trait::async_trait;
use colloquy_domain::{DiscussionId, OrchestratorSnapshot};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotStoreError {
    #[error("No snapshot for discussion {0}")]
    NotFound(DiscussionId),

    #[error("Snapshot I/O error: {0}")]
    Io(String),

    #[error("Snapshot is corrupt: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist `snapshot`, replacing any earlier one for the same discussion.
    async fn save(&self, snapshot: &OrchestratorSnapshot) -> Result<(), SnapshotStoreError>;

    async fn load(&self, id: &DiscussionId) -> Result<OrchestratorSnapshot, SnapshotStoreError>;

    /// Ids of every stored discussion, sorted.
    async fn list(&self) -> Result<Vec<DiscussionId>, SnapshotStoreError>;
}

/// Process-local store for tests and `--no-persist` runs.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<DiscussionId, OrchestratorSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<DiscussionId, OrchestratorSnapshot>>, SnapshotStoreError>
    {
        self.snapshots
            .lock()
            .map_err(|_| SnapshotStoreError::Io("snapshot map poisoned".to_string()))
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &OrchestratorSnapshot) -> Result<(), SnapshotStoreError> {
        self.lock()?
            .insert(snapshot.discussion.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, id: &DiscussionId) -> Result<OrchestratorSnapshot, SnapshotStoreError> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| SnapshotStoreError::NotFound(id.clone()))
    }

    async fn list(&self) -> Result<Vec<DiscussionId>, SnapshotStoreError> {
        let mut ids: Vec<_> = self.lock()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
