//! Discussion worker
//!
//! One tokio task per discussion owns its [`DiscussionOrchestrator`] and
//! processes commands strictly one at a time. After each committed
//! operation the worker:
//!
//! 1. applies the clock directive to its [`TurnClock`]
//! 2. publishes the events through the shared [`EventEmitter`]
//! 3. queues a snapshot for the persistence task
//! 4. asks the scoring provider for fresh scores when content was added
//!
//! Persistence and scoring run on their own tasks; their results come back
//! as commands, so the worker never awaits I/O while holding the floor.

use super::clock::TurnClock;
use super::command::{Command, Operation};
use super::emitter::EventEmitter;
use super::handle::DiscussionHandle;
use crate::config::RuntimeConfig;
use crate::ports::scoring::{ScoringError, ScoringProvider, ScoringRequest, ScoringResult};
use crate::ports::snapshot_store::SnapshotStore;
use colloquy_domain::{
    DiscussionEvent, DiscussionOrchestrator, OrchestratorError, OrchestratorSnapshot, Outcome,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Collaborators shared by every worker of a hub
#[derive(Clone)]
pub(crate) struct WorkerDeps {
    pub config: RuntimeConfig,
    pub emitter: Arc<EventEmitter>,
    pub snapshots: Option<Arc<dyn SnapshotStore>>,
    pub scorer: Option<Arc<dyn ScoringProvider>>,
    pub shutdown: CancellationToken,
}

/// Spawn a worker for `orchestrator` and return its handle and task.
pub(crate) fn spawn_worker(
    orchestrator: DiscussionOrchestrator,
    deps: WorkerDeps,
) -> (DiscussionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(deps.config.command_buffer.max(1));
    let handle = DiscussionHandle::new(orchestrator.id().clone(), tx.clone());

    let persister = deps.snapshots.clone().map(spawn_persister);
    let worker = DiscussionWorker {
        orchestrator,
        commands: rx,
        clock: TurnClock::new(tx.downgrade()),
        self_tx: tx.downgrade(),
        persister,
        scoring_in_flight: false,
        rescore_pending: false,
        deps,
    };
    drop(tx);

    (handle, tokio::spawn(worker.run()))
}

struct DiscussionWorker {
    orchestrator: DiscussionOrchestrator,
    commands: mpsc::Receiver<Command>,
    clock: TurnClock,
    self_tx: mpsc::WeakSender<Command>,
    persister: Option<(mpsc::UnboundedSender<OrchestratorSnapshot>, JoinHandle<()>)>,
    scoring_in_flight: bool,
    rescore_pending: bool,
    deps: WorkerDeps,
}

impl DiscussionWorker {
    async fn run(mut self) {
        let id = self.orchestrator.id().clone();
        info!(discussion = %id, status = %self.orchestrator.status(), "Discussion worker started");
        self.persist();

        loop {
            let command = tokio::select! {
                _ = self.deps.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            self.handle(command);
        }

        self.clock.disarm();
        if let Some((tx, task)) = self.persister.take() {
            drop(tx);
            if let Err(e) = task.await {
                warn!(discussion = %id, error = %e, "Snapshot task ended abnormally");
            }
        }
        info!(discussion = %id, "Discussion worker stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Apply { op, reply } => {
                let result = self.apply(op);
                // The caller may have given up waiting; the operation stands.
                let _ = reply.send(result);
            }
            Command::Timeout { kind, generation } => {
                match self
                    .orchestrator
                    .handle_timeout(kind, generation, Utc::now())
                {
                    Ok(outcome) if outcome.is_empty() => {
                        trace!(%kind, generation, "Stale timeout ignored");
                    }
                    Ok(outcome) => {
                        info!(
                            discussion = %self.orchestrator.id(),
                            %kind,
                            turn = self.orchestrator.current_turn().turn_number,
                            "Turn timed out"
                        );
                        self.commit(outcome, false);
                    }
                    Err(e) => warn!(%kind, error = %e, "Timeout could not be applied"),
                }
            }
            Command::ScoringFinished(result) => {
                self.scoring_in_flight = false;
                match result {
                    Ok(result) => self.apply_scoring(result),
                    Err(e) => warn!(discussion = %self.orchestrator.id(), error = %e, "Scoring failed"),
                }
                if std::mem::take(&mut self.rescore_pending) {
                    self.request_scoring();
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.orchestrator.snapshot());
            }
        }
    }

    fn apply(&mut self, op: Operation) -> Result<Vec<DiscussionEvent>, OrchestratorError> {
        let name = op.name();
        let rescore = op.adds_content();
        match op.apply(&mut self.orchestrator, Utc::now()) {
            Ok(outcome) => {
                debug!(
                    discussion = %self.orchestrator.id(),
                    op = name,
                    events = outcome.events.len(),
                    "Operation committed"
                );
                Ok(self.commit(outcome, rescore))
            }
            Err(e) => {
                debug!(
                    discussion = %self.orchestrator.id(),
                    op = name,
                    code = e.code(),
                    error = %e,
                    "Operation rejected"
                );
                Err(e)
            }
        }
    }

    fn commit(&mut self, outcome: Outcome, rescore: bool) -> Vec<DiscussionEvent> {
        self.clock.apply(outcome.clock);
        self.deps.emitter.emit(&outcome.events);
        if !outcome.events.is_empty() {
            self.persist();
        }
        if rescore {
            self.request_scoring();
        }
        outcome.events
    }

    fn persist(&self) {
        if !self.deps.config.snapshot_on_commit {
            return;
        }
        if let Some((tx, _)) = &self.persister {
            let _ = tx.send(self.orchestrator.snapshot());
        }
    }

    // ==================== Scoring ====================

    fn request_scoring(&mut self) {
        if !self.deps.config.scoring_enabled || self.orchestrator.status().is_terminal() {
            return;
        }
        let Some(scorer) = self.deps.scorer.clone() else {
            return;
        };
        if self.scoring_in_flight {
            self.rescore_pending = true;
            return;
        }

        let window = self.deps.config.scoring_window;
        let visible: Vec<_> = self.orchestrator.messages().visible().cloned().collect();
        let recent_messages = visible[visible.len().saturating_sub(window)..].to_vec();
        let request = ScoringRequest {
            discussion: self.orchestrator.discussion().clone(),
            recent_messages,
        };

        self.scoring_in_flight = true;
        let reply = self.self_tx.clone();
        tokio::spawn(async move {
            let result = scorer.score(&request).await;
            report_scoring(reply, result).await;
        });
    }

    fn apply_scoring(&mut self, result: ScoringResult) {
        if result.is_empty() {
            return;
        }
        let now = Utc::now();
        let mut changed = false;
        if !result.scores.is_empty() {
            match self.orchestrator.update_scores(result.scores, now) {
                Ok(_) => changed = true,
                Err(e) => debug!(error = %e, "Scores discarded"),
            }
        }
        if !result.analysis.is_empty() {
            match self.orchestrator.record_analysis(result.analysis, now) {
                Ok(_) => changed = true,
                Err(e) => debug!(error = %e, "Analysis discarded"),
            }
        }
        if changed {
            self.persist();
        }
    }
}

async fn report_scoring(
    reply: mpsc::WeakSender<Command>,
    result: Result<ScoringResult, ScoringError>,
) {
    if let Some(tx) = reply.upgrade() {
        let _ = tx.send(Command::ScoringFinished(result)).await;
    }
}

/// Save snapshots in order, skipping ahead to the newest one queued.
fn spawn_persister(
    store: Arc<dyn SnapshotStore>,
) -> (mpsc::UnboundedSender<OrchestratorSnapshot>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OrchestratorSnapshot>();
    let task = tokio::spawn(async move {
        while let Some(mut snapshot) = rx.recv().await {
            while let Ok(newer) = rx.try_recv() {
                snapshot = newer;
            }
            if let Err(e) = store.save(&snapshot).await {
                warn!(discussion = %snapshot.discussion.id, error = %e, "Failed to save snapshot");
            }
        }
    });
    (tx, task)
}
