//! Messages understood by a discussion worker.

use crate::ports::scoring::{ScoringError, ScoringResult};
use colloquy_domain::{
    DiscussionAnalysis, DiscussionEvent, DiscussionOrchestrator, DiscussionSettings, MessageDraft,
    MessageId, NewParticipant, OrchestratorError, OrchestratorSnapshot, Outcome, ParticipantId,
    ScoringInputs, TimeoutKind, TurnEndReason,
};
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// One orchestrator operation, owned so it can cross the channel.
#[derive(Debug, Clone)]
pub enum Operation {
    Start,
    Pause { reason: Option<String> },
    Resume,
    Cancel { reason: Option<String>, compensate: bool },
    Conclude { actor: ParticipantId, reason: Option<String> },
    Archive,
    Join { request: NewParticipant, invited_by: Option<ParticipantId> },
    Leave { participant: ParticipantId },
    SubmitMessage { participant: ParticipantId, draft: MessageDraft },
    EditMessage {
        actor: ParticipantId,
        message_id: MessageId,
        content: String,
        reason: Option<String>,
    },
    DeleteMessage { actor: ParticipantId, message_id: MessageId },
    AddReaction { actor: ParticipantId, message_id: MessageId, emoji: String },
    TypingStarted { participant: ParticipantId },
    TypingStopped { participant: ParticipantId },
    AdvanceTurn { reason: TurnEndReason },
    PassTurn { participant: ParticipantId },
    ModeratorPick { actor: ParticipantId, target: ParticipantId },
    ConfirmPick { actor: ParticipantId },
    RequestToSpeak { participant: ParticipantId },
    RearmClock,
    UpdateSettings { actor: ParticipantId, settings: DiscussionSettings },
    UpdateScores { scores: ScoringInputs },
    RecordAnalysis { analysis: DiscussionAnalysis },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Pause { .. } => "pause",
            Operation::Resume => "resume",
            Operation::Cancel { .. } => "cancel",
            Operation::Conclude { .. } => "conclude",
            Operation::Archive => "archive",
            Operation::Join { .. } => "join",
            Operation::Leave { .. } => "leave",
            Operation::SubmitMessage { .. } => "submit_message",
            Operation::EditMessage { .. } => "edit_message",
            Operation::DeleteMessage { .. } => "delete_message",
            Operation::AddReaction { .. } => "add_reaction",
            Operation::TypingStarted { .. } => "typing_started",
            Operation::TypingStopped { .. } => "typing_stopped",
            Operation::AdvanceTurn { .. } => "advance_turn",
            Operation::PassTurn { .. } => "pass_turn",
            Operation::ModeratorPick { .. } => "moderator_pick",
            Operation::ConfirmPick { .. } => "confirm_pick",
            Operation::RequestToSpeak { .. } => "request_to_speak",
            Operation::RearmClock => "rearm_clock",
            Operation::UpdateSettings { .. } => "update_settings",
            Operation::UpdateScores { .. } => "update_scores",
            Operation::RecordAnalysis { .. } => "record_analysis",
        }
    }

    /// Whether a committed run of this operation should trigger rescoring.
    pub fn adds_content(&self) -> bool {
        matches!(self, Operation::SubmitMessage { .. })
    }

    /// Apply to `orchestrator`. Nothing changes on error.
    pub fn apply(
        self,
        orchestrator: &mut DiscussionOrchestrator,
        now: DateTime<Utc>,
    ) -> Result<Outcome, OrchestratorError> {
        match self {
            Operation::Start => orchestrator.start(now),
            Operation::Pause { reason } => orchestrator.pause(reason, now),
            Operation::Resume => orchestrator.resume(now),
            Operation::Cancel { reason, compensate } => orchestrator.cancel(reason, compensate, now),
            Operation::Conclude { actor, reason } => orchestrator.conclude(&actor, reason, now),
            Operation::Archive => orchestrator.archive(now),
            Operation::Join { request, invited_by } => {
                orchestrator.join(request, invited_by.as_ref(), now)
            }
            Operation::Leave { participant } => orchestrator.leave(&participant, now),
            Operation::SubmitMessage { participant, draft } => {
                orchestrator.submit_message(&participant, draft, now)
            }
            Operation::EditMessage {
                actor,
                message_id,
                content,
                reason,
            } => orchestrator.edit_message(&actor, &message_id, content, reason, now),
            Operation::DeleteMessage { actor, message_id } => {
                orchestrator.delete_message(&actor, &message_id, now)
            }
            Operation::AddReaction {
                actor,
                message_id,
                emoji,
            } => orchestrator.add_reaction(&actor, &message_id, &emoji, now),
            Operation::TypingStarted { participant } => orchestrator.typing_started(&participant, now),
            Operation::TypingStopped { participant } => orchestrator.typing_stopped(&participant, now),
            Operation::AdvanceTurn { reason } => orchestrator.advance_turn(reason, now),
            Operation::PassTurn { participant } => orchestrator.pass_turn(&participant, now),
            Operation::ModeratorPick { actor, target } => {
                orchestrator.moderator_pick(&actor, &target, now)
            }
            Operation::ConfirmPick { actor } => orchestrator.confirm_pick(&actor, now),
            Operation::RequestToSpeak { participant } => {
                orchestrator.request_to_speak(&participant, now)
            }
            Operation::RearmClock => orchestrator.rearm_clock(now),
            Operation::UpdateSettings { actor, settings } => {
                orchestrator.update_settings(&actor, settings, now)
            }
            Operation::UpdateScores { scores } => orchestrator.update_scores(scores, now),
            Operation::RecordAnalysis { analysis } => orchestrator.record_analysis(analysis, now),
        }
    }
}

/// Commands sent to a discussion worker
#[derive(Debug)]
pub enum Command {
    /// Run an operation and reply with the events it emitted.
    Apply {
        op: Operation,
        reply: oneshot::Sender<Result<Vec<DiscussionEvent>, OrchestratorError>>,
    },
    /// A turn clock timer fired.
    Timeout { kind: TimeoutKind, generation: u64 },
    /// A scoring round finished.
    ScoringFinished(Result<ScoringResult, ScoringError>),
    Snapshot {
        reply: oneshot::Sender<OrchestratorSnapshot>,
    },
}
