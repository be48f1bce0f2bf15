//! Snapshot store backed by one JSON file per discussion.
//!
//! Files live at `<dir>/<discussion-id>.json`. Saves write a temporary file
//! and rename it over the old one, so a crash mid-save leaves the previous
//! snapshot intact.

use async_trait::async_trait;
use colloquy_application::{SnapshotStore, SnapshotStoreError};
use colloquy_domain::{DiscussionId, OrchestratorSnapshot};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "json";

pub struct JsonFileSnapshotStore {
    dir: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &DiscussionId) -> Result<PathBuf, SnapshotStoreError> {
        let name = id.as_str();
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(SnapshotStoreError::Io(format!(
                "discussion id '{}' is not usable as a file name",
                name
            )));
        }
        Ok(self.dir.join(format!("{}.{}", name, EXTENSION)))
    }
}

fn io_error(context: &str, path: &Path, e: std::io::Error) -> SnapshotStoreError {
    SnapshotStoreError::Io(format!("{} {}: {}", context, path.display(), e))
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn save(&self, snapshot: &OrchestratorSnapshot) -> Result<(), SnapshotStoreError> {
        let path = self.path_for(&snapshot.discussion.id)?;
        let json = snapshot
            .to_json()
            .map_err(|e| SnapshotStoreError::Corrupt(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("creating", &self.dir, e))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error("writing", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("renaming", &tmp, e))?;

        debug!(
            discussion = %snapshot.discussion.id,
            sequence = snapshot.next_sequence,
            "Snapshot saved"
        );
        Ok(())
    }

    async fn load(&self, id: &DiscussionId) -> Result<OrchestratorSnapshot, SnapshotStoreError> {
        let path = self.path_for(id)?;
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SnapshotStoreError::NotFound(id.clone()));
            }
            Err(e) => return Err(io_error("reading", &path, e)),
        };
        OrchestratorSnapshot::from_json(&json)
            .map_err(|e| SnapshotStoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    async fn list(&self) -> Result<Vec<DiscussionId>, SnapshotStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("listing", &self.dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("listing", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(DiscussionId::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use colloquy_domain::{
        DiscussionOrchestrator, MessageDraft, NewDiscussion, NewParticipant, ParticipantId,
    };

    fn orchestrator(id: &str) -> DiscussionOrchestrator {
        let request = NewDiscussion::new("Storage", "Where do snapshots live?")
            .with_id(id)
            .with_participant(NewParticipant::new("alice", "agent-a"))
            .with_participant(NewParticipant::new("bob", "agent-b"));
        DiscussionOrchestrator::create(request, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("snapshots"));

        let mut orchestrator = orchestrator("d-1");
        let now = Utc::now();
        orchestrator.start(now).unwrap();
        orchestrator
            .submit_message(&ParticipantId::new("alice"), MessageDraft::new("On disk"), now)
            .unwrap();
        let snapshot = orchestrator.snapshot();

        store.save(&snapshot).await.unwrap();
        let loaded = store.load(&DiscussionId::new("d-1")).await.unwrap();
        assert_eq!(loaded, snapshot);
        assert!(!dir.path().join("snapshots").join("d-1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path());

        let mut orchestrator = orchestrator("d-2");
        store.save(&orchestrator.snapshot()).await.unwrap();
        orchestrator.start(Utc::now()).unwrap();
        store.save(&orchestrator.snapshot()).await.unwrap();

        let loaded = store.load(&DiscussionId::new("d-2")).await.unwrap();
        assert_eq!(loaded.discussion.status, orchestrator.status());
    }

    #[tokio::test]
    async fn test_list_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("none-yet"));
        assert!(store.list().await.unwrap().is_empty());

        store.save(&orchestrator("b").snapshot()).await.unwrap();
        store.save(&orchestrator("a").snapshot()).await.unwrap();
        assert_eq!(
            store.list().await.unwrap(),
            vec![DiscussionId::new("a"), DiscussionId::new("b")]
        );

        assert!(matches!(
            store.load(&DiscussionId::new("zzz")).await,
            Err(SnapshotStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let store = JsonFileSnapshotStore::new(dir.path());
        assert!(matches!(
            store.load(&DiscussionId::new("bad")).await,
            Err(SnapshotStoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path());
        assert!(store.load(&DiscussionId::new("../etc/passwd")).await.is_err());
    }
}
