//! Client side of a discussion worker
//!
//! [`DiscussionHandle`] is cheap to clone and safe to share. Every call is a
//! command on the worker's channel with a oneshot reply, so operations on one
//! discussion are applied strictly one at a time, in arrival order.

use super::command::{Command, Operation};
use super::error::DiscussionRuntimeError;
use colloquy_domain::{
    Discussion, DiscussionAnalysis, DiscussionEvent, DiscussionId, DiscussionSettings,
    MessageDraft, MessageId, NewParticipant, OrchestratorSnapshot, ParticipantId, ScoringInputs,
    TurnEndReason,
};
use tokio::sync::{mpsc, oneshot};

type Events = Result<Vec<DiscussionEvent>, DiscussionRuntimeError>;

#[derive(Clone)]
pub struct DiscussionHandle {
    id: DiscussionId,
    tx: mpsc::Sender<Command>,
}

impl DiscussionHandle {
    pub(crate) fn new(id: DiscussionId, tx: mpsc::Sender<Command>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &DiscussionId {
        &self.id
    }

    /// The worker has stopped and will not accept commands.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn closed(&self) -> DiscussionRuntimeError {
        DiscussionRuntimeError::WorkerClosed(self.id.clone())
    }

    /// Run one operation and return the events it emitted.
    pub async fn apply(&self, op: Operation) -> Events {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Apply { op, reply: reply_tx })
            .await
            .map_err(|_| self.closed())?;
        Ok(reply_rx.await.map_err(|_| self.closed())??)
    }

    pub async fn snapshot(&self) -> Result<OrchestratorSnapshot, DiscussionRuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| self.closed())?;
        reply_rx.await.map_err(|_| self.closed())
    }

    pub async fn discussion(&self) -> Result<Discussion, DiscussionRuntimeError> {
        Ok(self.snapshot().await?.discussion)
    }

    // ==================== Lifecycle ====================

    pub async fn start(&self) -> Events {
        self.apply(Operation::Start).await
    }

    pub async fn pause(&self, reason: Option<String>) -> Events {
        self.apply(Operation::Pause { reason }).await
    }

    pub async fn resume(&self) -> Events {
        self.apply(Operation::Resume).await
    }

    pub async fn cancel(&self, reason: Option<String>, compensate: bool) -> Events {
        self.apply(Operation::Cancel { reason, compensate }).await
    }

    pub async fn conclude(&self, actor: &ParticipantId, reason: Option<String>) -> Events {
        self.apply(Operation::Conclude {
            actor: actor.clone(),
            reason,
        })
        .await
    }

    pub async fn archive(&self) -> Events {
        self.apply(Operation::Archive).await
    }

    // ==================== Participants ====================

    pub async fn join(&self, request: NewParticipant, invited_by: Option<&ParticipantId>) -> Events {
        self.apply(Operation::Join {
            request,
            invited_by: invited_by.cloned(),
        })
        .await
    }

    pub async fn leave(&self, participant: &ParticipantId) -> Events {
        self.apply(Operation::Leave {
            participant: participant.clone(),
        })
        .await
    }

    // ==================== Messages ====================

    pub async fn submit_message(&self, participant: &ParticipantId, draft: MessageDraft) -> Events {
        self.apply(Operation::SubmitMessage {
            participant: participant.clone(),
            draft,
        })
        .await
    }

    pub async fn edit_message(
        &self,
        actor: &ParticipantId,
        message_id: &MessageId,
        content: impl Into<String>,
        reason: Option<String>,
    ) -> Events {
        self.apply(Operation::EditMessage {
            actor: actor.clone(),
            message_id: message_id.clone(),
            content: content.into(),
            reason,
        })
        .await
    }

    pub async fn delete_message(&self, actor: &ParticipantId, message_id: &MessageId) -> Events {
        self.apply(Operation::DeleteMessage {
            actor: actor.clone(),
            message_id: message_id.clone(),
        })
        .await
    }

    pub async fn add_reaction(
        &self,
        actor: &ParticipantId,
        message_id: &MessageId,
        emoji: impl Into<String>,
    ) -> Events {
        self.apply(Operation::AddReaction {
            actor: actor.clone(),
            message_id: message_id.clone(),
            emoji: emoji.into(),
        })
        .await
    }

    pub async fn typing_started(&self, participant: &ParticipantId) -> Events {
        self.apply(Operation::TypingStarted {
            participant: participant.clone(),
        })
        .await
    }

    pub async fn typing_stopped(&self, participant: &ParticipantId) -> Events {
        self.apply(Operation::TypingStopped {
            participant: participant.clone(),
        })
        .await
    }

    // ==================== Turns ====================

    pub async fn advance_turn(&self, reason: TurnEndReason) -> Events {
        self.apply(Operation::AdvanceTurn { reason }).await
    }

    pub async fn pass_turn(&self, participant: &ParticipantId) -> Events {
        self.apply(Operation::PassTurn {
            participant: participant.clone(),
        })
        .await
    }

    pub async fn moderator_pick(&self, actor: &ParticipantId, target: &ParticipantId) -> Events {
        self.apply(Operation::ModeratorPick {
            actor: actor.clone(),
            target: target.clone(),
        })
        .await
    }

    pub async fn confirm_pick(&self, actor: &ParticipantId) -> Events {
        self.apply(Operation::ConfirmPick {
            actor: actor.clone(),
        })
        .await
    }

    pub async fn request_to_speak(&self, participant: &ParticipantId) -> Events {
        self.apply(Operation::RequestToSpeak {
            participant: participant.clone(),
        })
        .await
    }

    pub async fn rearm_clock(&self) -> Events {
        self.apply(Operation::RearmClock).await
    }

    // ==================== Settings & analysis ====================

    pub async fn update_settings(&self, actor: &ParticipantId, settings: DiscussionSettings) -> Events {
        self.apply(Operation::UpdateSettings {
            actor: actor.clone(),
            settings,
        })
        .await
    }

    pub async fn update_scores(&self, scores: ScoringInputs) -> Events {
        self.apply(Operation::UpdateScores { scores }).await
    }

    pub async fn record_analysis(&self, analysis: DiscussionAnalysis) -> Events {
        self.apply(Operation::RecordAnalysis { analysis }).await
    }
}
