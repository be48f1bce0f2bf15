//! DiscussionHub use case
//!
//! Owns the live discussions of a process: spawns a worker per discussion,
//! hands out [`DiscussionHandle`]s, restores discussions from the snapshot
//! store and shuts everything down in order.

use crate::config::RuntimeConfig;
use crate::discussion::worker::{WorkerDeps, spawn_worker};
use crate::discussion::{DiscussionHandle, DiscussionRuntimeError, EventEmitter};
use crate::ports::event_subscriber::EventSubscriber;
use crate::ports::scoring::ScoringProvider;
use crate::ports::snapshot_store::SnapshotStore;
use colloquy_domain::{DiscussionEvent, DiscussionId, DiscussionOrchestrator, NewDiscussion};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct DiscussionHub {
    config: RuntimeConfig,
    emitter: Arc<EventEmitter>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    scorer: Option<Arc<dyn ScoringProvider>>,
    discussions: Mutex<HashMap<DiscussionId, DiscussionHandle>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl DiscussionHub {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            emitter: Arc::new(EventEmitter::new()),
            snapshots: None,
            scorer: None,
            discussions: Mutex::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ScoringProvider>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn discussions(&self) -> MutexGuard<'_, HashMap<DiscussionId, DiscussionHandle>> {
        self.discussions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Events ====================

    /// Deliver events of every discussion to `subscriber`.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.emitter.subscribe(subscriber);
    }

    /// Receive events of every discussion on a channel.
    pub fn event_channel(&self, name: impl Into<String>) -> mpsc::UnboundedReceiver<DiscussionEvent> {
        self.emitter.channel(name)
    }

    // ==================== Discussions ====================

    /// Create a `draft` discussion and spawn its worker.
    pub fn create(&self, request: NewDiscussion) -> Result<DiscussionHandle, DiscussionRuntimeError> {
        if let Some(id) = &request.id
            && self.discussions().contains_key(id)
        {
            return Err(DiscussionRuntimeError::DuplicateDiscussion(id.clone()));
        }
        let orchestrator = DiscussionOrchestrator::create(request, Utc::now())?;
        info!(
            discussion = %orchestrator.id(),
            title = %orchestrator.discussion().title,
            strategy = %orchestrator.discussion().turn_strategy.kind(),
            "Discussion created"
        );
        self.spawn(orchestrator)
    }

    /// Bring a discussion back from the snapshot store and re-arm its clock.
    pub async fn restore(&self, id: &DiscussionId) -> Result<DiscussionHandle, DiscussionRuntimeError> {
        if self.discussions().contains_key(id) {
            return Err(DiscussionRuntimeError::DuplicateDiscussion(id.clone()));
        }
        let Some(store) = &self.snapshots else {
            return Err(DiscussionRuntimeError::UnknownDiscussion(id.clone()));
        };
        let snapshot = store.load(id).await?;
        let orchestrator = DiscussionOrchestrator::restore(snapshot)?;
        info!(
            discussion = %id,
            status = %orchestrator.status(),
            turn = orchestrator.current_turn().turn_number,
            "Discussion restored"
        );
        let handle = self.spawn(orchestrator)?;
        handle.rearm_clock().await?;
        Ok(handle)
    }

    fn spawn(&self, orchestrator: DiscussionOrchestrator) -> Result<DiscussionHandle, DiscussionRuntimeError> {
        let id = orchestrator.id().clone();
        let mut discussions = self.discussions();
        if discussions.contains_key(&id) {
            return Err(DiscussionRuntimeError::DuplicateDiscussion(id));
        }
        let deps = WorkerDeps {
            config: self.config.clone(),
            emitter: Arc::clone(&self.emitter),
            snapshots: self.snapshots.clone(),
            scorer: self.scorer.clone(),
            shutdown: self.shutdown.child_token(),
        };
        let (handle, task) = spawn_worker(orchestrator, deps);
        discussions.insert(id, handle.clone());
        drop(discussions);
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        workers.retain(|worker| !worker.is_finished());
        workers.push(task);
        Ok(handle)
    }

    pub fn get(&self, id: &DiscussionId) -> Result<DiscussionHandle, DiscussionRuntimeError> {
        self.discussions()
            .get(id)
            .cloned()
            .ok_or_else(|| DiscussionRuntimeError::UnknownDiscussion(id.clone()))
    }

    /// Ids of the live discussions, sorted.
    pub fn ids(&self) -> Vec<DiscussionId> {
        let mut ids: Vec<_> = self.discussions().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Worker tasks that have not finished yet.
    pub fn running_workers(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|worker| !worker.is_finished())
            .count()
    }

    /// Forget a discussion. Its worker stops once the last handle is dropped.
    pub fn release(&self, id: &DiscussionId) -> Result<(), DiscussionRuntimeError> {
        self.discussions()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DiscussionRuntimeError::UnknownDiscussion(id.clone()))
    }

    /// Stop every worker, wait for pending snapshots, then drain subscribers.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.discussions().clear();
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        futures::future::join_all(workers).await;
        self.emitter.close().await;
        info!("Discussion hub stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::scoring::{ScoringError, ScoringRequest, ScoringResult};
    use crate::ports::snapshot_store::InMemorySnapshotStore;
    use async_trait::async_trait;
    use colloquy_domain::{
        DiscussionEventType, DiscussionSettings, DiscussionStatus, FreeFormConfig, MessageDraft,
        NewParticipant, OrchestratorError, ParticipantId, ParticipantScores, ScoringInputs,
        TurnStrategyConfig,
    };
    use std::time::Duration;

    fn request(id: &str, turn_timeout_secs: u64) -> NewDiscussion {
        NewDiscussion::new("Release plan", "What ships in 2.0")
            .with_id(id)
            .with_settings(DiscussionSettings {
                turn_timeout_secs,
                response_timeout_secs: 0,
                ..Default::default()
            })
            .with_participant(NewParticipant::new("alice", "agent-a"))
            .with_participant(NewParticipant::new("bob", "agent-b"))
            .with_participant(NewParticipant::new("carol", "agent-c"))
    }

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    async fn holder(handle: &DiscussionHandle) -> Option<ParticipantId> {
        handle
            .discussion()
            .await
            .unwrap()
            .state
            .current_turn
            .participant_id
    }

    #[tokio::test]
    async fn test_message_moves_turn_and_events_arrive_in_order() {
        let hub = DiscussionHub::new(RuntimeConfig::default());
        let mut events = hub.event_channel("test");
        let handle = hub.create(request("d-1", 300)).unwrap();

        handle.start().await.unwrap();
        assert_eq!(holder(&handle).await, Some(pid("alice")));

        let emitted = handle
            .submit_message(&pid("alice"), MessageDraft::new("Ship the parser"))
            .await
            .unwrap();
        assert!(emitted.iter().any(|e| e.event_type() == DiscussionEventType::MessageSent));
        assert_eq!(holder(&handle).await, Some(pid("bob")));

        hub.shutdown().await;
        let mut sequences = Vec::new();
        while let Some(event) = events.recv().await {
            sequences.push(event.sequence);
        }
        let expected: Vec<u64> = (1..=sequences.len() as u64).collect();
        assert!(!sequences.is_empty());
        assert_eq!(sequences, expected);
    }

    #[tokio::test]
    async fn test_rejection_leaves_state_untouched() {
        let hub = DiscussionHub::new(RuntimeConfig::default());
        let handle = hub.create(request("d-2", 300)).unwrap();
        handle.start().await.unwrap();
        let before = handle.snapshot().await.unwrap();

        let err = handle
            .submit_message(&pid("bob"), MessageDraft::new("Out of turn"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(OrchestratorError::TurnViolation { .. })
        ));
        assert_eq!(handle.snapshot().await.unwrap(), before);
        hub.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_timeout_advances_turn() {
        let hub = DiscussionHub::new(RuntimeConfig::default());
        let handle = hub.create(request("d-3", 30)).unwrap();
        handle.start().await.unwrap();
        assert_eq!(holder(&handle).await, Some(pid("alice")));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(holder(&handle).await, Some(pid("bob")));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.strategy_state.round_robin.skips(&pid("alice")), 1);
        hub.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_the_clock() {
        let hub = DiscussionHub::new(RuntimeConfig::default());
        let handle = hub.create(request("d-4", 30)).unwrap();
        handle.start().await.unwrap();
        handle.pause(Some("lunch".to_string())).await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        let discussion = handle.discussion().await.unwrap();
        assert_eq!(discussion.status, DiscussionStatus::Paused);
        assert_eq!(discussion.state.current_turn.participant_id, Some(pid("alice")));
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_queued_speaker_gets_the_floor_after_cooldown() {
        let hub = DiscussionHub::new(RuntimeConfig::default().with_snapshot_on_commit(false));
        let handle = hub
            .create(request("d-9", 300).with_strategy(TurnStrategyConfig::FreeForm(FreeFormConfig {
                cooldown_period_secs: 1,
            })))
            .unwrap();
        handle.start().await.unwrap();
        handle.request_to_speak(&pid("alice")).await.unwrap();
        handle.pass_turn(&pid("alice")).await.unwrap();
        handle.request_to_speak(&pid("alice")).await.unwrap();
        assert_eq!(holder(&handle).await, None);

        // The worker stamps operations with wall-clock time, so wait in real time.
        let mut granted = None;
        for _ in 0..60 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            granted = holder(&handle).await;
            if granted.is_some() {
                break;
            }
        }
        assert_eq!(granted, Some(pid("alice")));
        assert_eq!(handle.discussion().await.unwrap().state.current_turn.turn_number, 2);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_released_workers_are_pruned() {
        let hub = DiscussionHub::new(RuntimeConfig::default().with_snapshot_on_commit(false));
        let first = hub.create(request("d-10", 300)).unwrap();
        hub.release(first.id()).unwrap();
        drop(first);

        for _ in 0..50 {
            if hub.running_workers() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(hub.running_workers(), 0);

        hub.create(request("d-11", 300)).unwrap();
        assert_eq!(hub.workers.lock().unwrap().len(), 1);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_discussions() {
        let hub = DiscussionHub::new(RuntimeConfig::default());
        hub.create(request("d-5", 300)).unwrap();
        assert!(matches!(
            hub.create(request("d-5", 300)),
            Err(DiscussionRuntimeError::DuplicateDiscussion(_))
        ));
        assert!(matches!(
            hub.get(&DiscussionId::new("nope")),
            Err(DiscussionRuntimeError::UnknownDiscussion(_))
        ));
        assert_eq!(hub.ids(), vec![DiscussionId::new("d-5")]);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_restore_from_store_resumes_where_it_left_off() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let hub = DiscussionHub::new(RuntimeConfig::default()).with_snapshot_store(store.clone());
        let handle = hub.create(request("d-6", 300)).unwrap();
        handle.start().await.unwrap();
        handle
            .submit_message(&pid("alice"), MessageDraft::new("First point"))
            .await
            .unwrap();
        let saved = handle.snapshot().await.unwrap();
        hub.shutdown().await;

        let hub = DiscussionHub::new(RuntimeConfig::default()).with_snapshot_store(store.clone());
        let id = DiscussionId::new("d-6");
        let restored = hub.restore(&id).await.unwrap();
        let snapshot = restored.snapshot().await.unwrap();
        assert_eq!(
            snapshot.discussion.state.current_turn.turn_number,
            saved.discussion.state.current_turn.turn_number
        );
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(holder(&restored).await, Some(pid("bob")));

        assert!(matches!(
            hub.restore(&id).await,
            Err(DiscussionRuntimeError::DuplicateDiscussion(_))
        ));
        hub.shutdown().await;
    }

    struct FixedScorer;

    #[async_trait]
    impl ScoringProvider for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, request: &ScoringRequest) -> Result<ScoringResult, ScoringError> {
            let mut result = ScoringResult::default();
            for participant in request.discussion.participants.iter() {
                result
                    .scores
                    .set(participant.id.clone(), ParticipantScores::new(0.5, 0.5, 0.5));
            }
            Ok(result)
        }
    }

    #[tokio::test]
    async fn test_scores_arrive_after_message() {
        let hub = DiscussionHub::new(RuntimeConfig::default()).with_scorer(Arc::new(FixedScorer));
        let handle = hub.create(request("d-7", 300)).unwrap();
        handle.start().await.unwrap();
        handle
            .submit_message(&pid("alice"), MessageDraft::new("Scored point"))
            .await
            .unwrap();

        let mut scores = ScoringInputs::new();
        for _ in 0..50 {
            scores = handle.snapshot().await.unwrap().scores;
            if !scores.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(scores.len(), 3);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_reports_closed_worker() {
        let hub = DiscussionHub::new(RuntimeConfig::default());
        let handle = hub.create(request("d-8", 300)).unwrap();
        hub.shutdown().await;

        assert!(matches!(
            handle.start().await,
            Err(DiscussionRuntimeError::WorkerClosed(_))
        ));
    }
}
