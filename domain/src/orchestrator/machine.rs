//! Discussion state machine
//!
//! [`DiscussionOrchestrator`] owns one discussion and is the only thing that
//! mutates it. Every public operation takes the current time explicitly,
//! runs against a working copy, and is committed only if it succeeds, so a
//! rejected operation leaves no trace and emits nothing.
//!
//! Operations return an [`Outcome`]: the events to publish and what the
//! runtime's turn clock should do next. The orchestrator itself never
//! sleeps and performs no I/O.

use super::outcome::Outcome;
use super::snapshot::{OrchestratorSnapshot, SNAPSHOT_VERSION};
use crate::core::error::{OrchestratorError, Result, TurnSnapshot};
use crate::core::id::{DiscussionId, EventId, MessageId, ParticipantId};
use crate::discussion::entities::{
    Discussion, DiscussionPhase, DiscussionStatus, NewDiscussion,
};
use crate::discussion::settings::DiscussionSettings;
use crate::discussion::state::{CurrentTurn, DiscussionAnalysis};
use crate::event::{DiscussionEvent, EventPayload, LeaveReason};
use crate::message::entities::MessageDraft;
use crate::message::log::{MessageLog, MessageLogError};
use crate::participant::entities::{DiscussionParticipant, NewParticipant, ParticipantAction};
use crate::participant::registry::RegistryError;
use crate::turn::clock::{ClockArm, ClockDirective, TimeoutKind};
use crate::turn::config::TurnStrategyConfig;
use crate::turn::scoring::ScoringInputs;
use crate::turn::selection::{TurnContext, TurnEndReason, TurnSelection, select_next};
use crate::turn::state::StrategyState;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct DiscussionOrchestrator {
    discussion: Discussion,
    strategy_state: StrategyState,
    messages: MessageLog,
    scores: ScoringInputs,
    next_sequence: u64,
    timer_generation: u64,
}

impl DiscussionOrchestrator {
    /// Create a discussion in `draft`. No events are emitted.
    pub fn create(request: NewDiscussion, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self::from_discussion(Discussion::create(request, now)?))
    }

    pub fn from_discussion(discussion: Discussion) -> Self {
        Self {
            discussion,
            strategy_state: StrategyState::default(),
            messages: MessageLog::new(),
            scores: ScoringInputs::new(),
            next_sequence: 1,
            timer_generation: 0,
        }
    }

    pub fn restore(snapshot: OrchestratorSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(OrchestratorError::InvalidInput(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(Self {
            discussion: snapshot.discussion,
            strategy_state: snapshot.strategy_state,
            messages: snapshot.messages,
            scores: snapshot.scores,
            next_sequence: snapshot.next_sequence,
            timer_generation: snapshot.timer_generation,
        })
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            version: SNAPSHOT_VERSION,
            discussion: self.discussion.clone(),
            strategy_state: self.strategy_state.clone(),
            messages: self.messages.clone(),
            scores: self.scores.clone(),
            next_sequence: self.next_sequence,
            timer_generation: self.timer_generation,
        }
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &DiscussionId {
        &self.discussion.id
    }

    pub fn discussion(&self) -> &Discussion {
        &self.discussion
    }

    pub fn status(&self) -> DiscussionStatus {
        self.discussion.status
    }

    pub fn phase(&self) -> DiscussionPhase {
        self.discussion.state.phase
    }

    pub fn current_turn(&self) -> &CurrentTurn {
        &self.discussion.state.current_turn
    }

    pub fn current_speaker(&self) -> Option<&ParticipantId> {
        self.discussion.state.current_turn.participant_id.as_ref()
    }

    pub fn strategy_state(&self) -> &StrategyState {
        &self.strategy_state
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn scores(&self) -> &ScoringInputs {
        &self.scores
    }

    pub fn timer_generation(&self) -> u64 {
        self.timer_generation
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn turn_snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            status: self.discussion.status,
            phase: self.discussion.state.phase,
            current_speaker: self.current_speaker().cloned(),
            turn_number: self.discussion.state.current_turn.turn_number,
        }
    }

    // ==================== Lifecycle ====================

    /// `draft → active`: hand out turn 1 and arm the clock.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.start())
    }

    /// `active → paused`. The current turn is kept; the clock stops.
    pub fn pause(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.pause(reason))
    }

    /// `paused → active`. The current turn restarts with a fresh deadline.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.resume())
    }

    /// Abort the discussion. Cancelling a cancelled discussion is a no-op.
    ///
    /// With `compensate`, open action items are cancelled and queued picks
    /// and speak requests are dropped.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        compensate: bool,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.cancel(reason, compensate))
    }

    /// End the discussion normally on behalf of a participant allowed to.
    pub fn conclude(
        &mut self,
        actor: &ParticipantId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.conclude_by(actor, reason))
    }

    /// `completed | cancelled → archived`.
    pub fn archive(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.archive())
    }

    // ==================== Participants ====================

    /// Add (or reactivate) a participant, optionally on behalf of an inviter.
    pub fn join(
        &mut self,
        request: NewParticipant,
        invited_by: Option<&ParticipantId>,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.join(request, invited_by))
    }

    /// Deactivate a participant. If they held the turn it moves on at once.
    pub fn leave(&mut self, participant: &ParticipantId, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.leave(participant))
    }

    // ==================== Messages ====================

    pub fn submit_message(
        &mut self,
        participant: &ParticipantId,
        draft: MessageDraft,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.submit_message(participant, draft))
    }

    /// Edit a message. Allowed for its author and for moderators.
    pub fn edit_message(
        &mut self,
        actor: &ParticipantId,
        message_id: &MessageId,
        content: String,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.edit_message(actor, message_id, content, reason))
    }

    /// Soft-delete a message. Allowed for its author and for moderators.
    pub fn delete_message(
        &mut self,
        actor: &ParticipantId,
        message_id: &MessageId,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.delete_message(actor, message_id))
    }

    pub fn add_reaction(
        &mut self,
        actor: &ParticipantId,
        message_id: &MessageId,
        emoji: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.add_reaction(actor, message_id, emoji))
    }

    pub fn typing_started(&mut self, participant: &ParticipantId, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.typing(participant, EventPayload::TypingStarted))
    }

    pub fn typing_stopped(&mut self, participant: &ParticipantId, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.typing(participant, EventPayload::TypingStopped))
    }

    // ==================== Turns ====================

    /// End the current turn and let the strategy pick the next one.
    pub fn advance_turn(&mut self, reason: TurnEndReason, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| {
            step.require_status(&[DiscussionStatus::Active], "advance the turn")?;
            step.advance(reason)
        })
    }

    /// The turn holder gives up the rest of their turn.
    pub fn pass_turn(&mut self, participant: &ParticipantId, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.pass(participant))
    }

    /// Moderated: choose the next speaker. Takes effect immediately unless
    /// the strategy requires approval, in which case it waits for
    /// [`confirm_pick`](Self::confirm_pick).
    pub fn moderator_pick(
        &mut self,
        actor: &ParticipantId,
        target: &ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.moderator_pick(actor, target))
    }

    /// Moderated: approve the provisional pick and hand over the turn.
    pub fn confirm_pick(&mut self, actor: &ParticipantId, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| step.confirm_pick(actor))
    }

    /// Free-Form: queue a wish to speak. Granted at once if the floor is open.
    pub fn request_to_speak(
        &mut self,
        participant: &ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.request_to_speak(participant))
    }

    /// Timer callback. Timeouts from an older arming are ignored.
    pub fn handle_timeout(
        &mut self,
        kind: TimeoutKind,
        generation: u64,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        if generation != self.timer_generation || self.discussion.status != DiscussionStatus::Active {
            return Ok(Outcome::default());
        }
        self.transact(now, |step| step.timeout(kind))
    }

    /// Arm the clock for the current state, e.g. after a restore.
    pub fn rearm_clock(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| {
            if step.status() == DiscussionStatus::Active {
                step.arm_turn();
            } else {
                step.disarm();
            }
            Ok(())
        })
    }

    // ==================== Settings & analysis ====================

    pub fn update_settings(
        &mut self,
        actor: &ParticipantId,
        settings: DiscussionSettings,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| step.update_settings(actor, settings))
    }

    /// Merge externally computed participant scores.
    pub fn update_scores(&mut self, scores: ScoringInputs, now: DateTime<Utc>) -> Result<Outcome> {
        self.transact(now, |step| {
            step.require_not_terminal("update scores")?;
            step.next.scores.merge(scores);
            Ok(())
        })
    }

    /// Merge derived scores, key points, decisions and action items.
    pub fn record_analysis(
        &mut self,
        analysis: DiscussionAnalysis,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transact(now, |step| {
            step.require_not_terminal("record analysis")?;
            step.next.discussion.state.apply_analysis(analysis);
            Ok(())
        })
    }

    fn transact<F>(&mut self, now: DateTime<Utc>, op: F) -> Result<Outcome>
    where
        F: FnOnce(&mut Step) -> Result<()>,
    {
        let mut step = Step {
            before: self.turn_snapshot(),
            next: self.clone(),
            now,
            outcome: Outcome::default(),
        };
        op(&mut step)?;
        *self = step.next;
        Ok(step.outcome)
    }
}

/// One operation in progress against a working copy
struct Step {
    before: TurnSnapshot,
    next: DiscussionOrchestrator,
    now: DateTime<Utc>,
    outcome: Outcome,
}

impl Step {
    // ---------- errors ----------

    fn invalid_state(&self, message: impl Into<String>) -> OrchestratorError {
        OrchestratorError::InvalidState {
            message: message.into(),
            context: self.before.clone(),
        }
    }

    fn not_eligible(&self, participant: &ParticipantId, reason: impl Into<String>) -> OrchestratorError {
        OrchestratorError::NotEligible {
            participant: participant.clone(),
            reason: reason.into(),
            context: self.before.clone(),
        }
    }

    fn turn_violation(&self, participant: &ParticipantId) -> OrchestratorError {
        OrchestratorError::TurnViolation {
            participant: participant.clone(),
            context: self.before.clone(),
        }
    }

    fn conflict(&self, message: impl Into<String>) -> OrchestratorError {
        OrchestratorError::Conflict {
            message: message.into(),
            context: self.before.clone(),
        }
    }

    fn not_found(&self, resource: &'static str, id: impl ToString) -> OrchestratorError {
        OrchestratorError::NotFound {
            resource,
            id: id.to_string(),
            context: self.before.clone(),
        }
    }

    // ---------- guards ----------

    fn status(&self) -> DiscussionStatus {
        self.next.discussion.status
    }

    fn holder(&self) -> Option<&ParticipantId> {
        self.next.discussion.state.current_turn.participant_id.as_ref()
    }

    fn require_status(&self, allowed: &[DiscussionStatus], action: &str) -> Result<()> {
        let status = self.status();
        if allowed.contains(&status) {
            Ok(())
        } else {
            Err(self.invalid_state(format!("cannot {} while {}", action, status)))
        }
    }

    fn require_not_terminal(&self, action: &str) -> Result<()> {
        if self.status().is_terminal() {
            Err(self.invalid_state(format!("cannot {} once {}", action, self.status())))
        } else {
            Ok(())
        }
    }

    fn participant(&self, id: &ParticipantId) -> Result<&DiscussionParticipant> {
        self.next
            .discussion
            .participants
            .get(id)
            .ok_or_else(|| self.not_found("participant", id))
    }

    fn require_active_participant(&self, id: &ParticipantId) -> Result<&DiscussionParticipant> {
        let participant = self.participant(id)?;
        if !participant.is_active {
            return Err(self.not_eligible(id, "participant is not active"));
        }
        Ok(participant)
    }

    fn require_permission(&self, id: &ParticipantId, action: ParticipantAction, what: &str) -> Result<()> {
        let participant = self.require_active_participant(id)?;
        if participant.permissions.allows(action) {
            Ok(())
        } else {
            Err(self.not_eligible(id, format!("lacks permission to {}", what)))
        }
    }

    fn require_author_or_moderator(&self, actor: &ParticipantId, message_id: &MessageId) -> Result<()> {
        let participant = self.require_active_participant(actor)?;
        let message = self
            .next
            .messages
            .get(message_id)
            .ok_or_else(|| self.not_found("message", message_id))?;
        if &message.participant_id == actor || participant.permissions.can_moderate {
            Ok(())
        } else {
            Err(self.not_eligible(actor, "only the author or a moderator may change this message"))
        }
    }

    fn strategy(&self) -> &TurnStrategyConfig {
        &self.next.discussion.turn_strategy
    }

    // ---------- events & clock ----------

    fn emit(&mut self, participant_id: Option<ParticipantId>, payload: EventPayload) {
        let sequence = self.next.next_sequence;
        self.next.next_sequence += 1;
        self.outcome.events.push(DiscussionEvent {
            id: EventId::generate(),
            discussion_id: self.next.discussion.id.clone(),
            sequence,
            participant_id,
            timestamp: self.now,
            payload,
        });
    }

    fn emit_status(&mut self, actor: Option<ParticipantId>, from: DiscussionStatus, reason: Option<String>) {
        let payload = EventPayload::StatusChanged {
            from,
            to: self.status(),
            phase: self.next.discussion.state.phase,
            reason,
        };
        self.emit(actor, payload);
    }

    /// Time left before `max_duration` runs out, if the discussion has a limit.
    fn discussion_time_left(&self) -> Option<Duration> {
        let d = &self.next.discussion;
        let started = d.started_at?;
        let limit = d.settings.max_duration()?;
        Some(started + limit - self.now)
    }

    fn duration_exceeded(&self) -> bool {
        self.discussion_time_left()
            .is_some_and(|left| left <= Duration::zero())
    }

    fn set_timers(&mut self, turn_in: Option<Duration>, response_in: Option<Duration>) {
        self.next.timer_generation += 1;
        let to_std = |d: Duration| d.to_std().unwrap_or(std::time::Duration::ZERO);
        let arm = ClockArm {
            generation: self.next.timer_generation,
            turn_in: turn_in.map(to_std),
            response_in: response_in.map(to_std),
        };
        let directive = if arm.is_idle() {
            ClockDirective::Disarm
        } else {
            ClockDirective::Arm(arm)
        };
        self.outcome.clock = self.outcome.clock.then(directive);
    }

    fn disarm(&mut self) {
        self.next.timer_generation += 1;
        self.outcome.clock = self.outcome.clock.then(ClockDirective::Disarm);
    }

    /// Start the current turn's deadlines from now.
    ///
    /// The turn timer doubles as the discussion deadline when `max_duration`
    /// ends sooner. Nothing is armed unless the discussion is active.
    fn arm_turn(&mut self) {
        let settings = &self.next.discussion.settings;
        let turn_timeout = settings.turn_timeout();
        let response_timeout = settings.response_timeout();
        let left = self.discussion_time_left();
        let now = self.now;

        let has_holder = self.holder().is_some();
        self.next.discussion.state.current_turn.expected_end_at = if has_holder {
            turn_timeout.map(|t| now + t)
        } else {
            None
        };
        if self.status() != DiscussionStatus::Active {
            return;
        }
        if has_holder {
            self.set_timers(earliest(turn_timeout, left), response_timeout);
        } else {
            let wake = self.cooldown_wake();
            self.set_timers(earliest(left, wake), None);
        }
    }

    /// Time until the first queued speak request leaves its cooldown.
    fn cooldown_wake(&self) -> Option<Duration> {
        let TurnStrategyConfig::FreeForm(config) = self.strategy() else {
            return None;
        };
        let cooldown = Duration::seconds(config.cooldown_period_secs as i64);
        let free_form = &self.next.strategy_state.free_form;
        free_form
            .speak_queue
            .iter()
            .filter_map(|id| free_form.cooldown_remaining(id, self.now, cooldown))
            .min()
    }

    /// Restart the silence window after a message within a continuing turn.
    fn rearm_response(&mut self) {
        let now = self.now;
        let turn_left = self
            .next
            .discussion
            .state
            .current_turn
            .expected_end_at
            .map(|end| end - now);
        let response_timeout = self.next.discussion.settings.response_timeout();
        self.set_timers(earliest(turn_left, self.discussion_time_left()), response_timeout);
    }

    fn refresh_active_count(&mut self) {
        self.next.discussion.state.active_participants =
            self.next.discussion.participants.active_count();
    }

    // ---------- turn handover ----------

    /// End the current turn and apply the strategy's choice.
    fn advance(&mut self, reason: TurnEndReason) -> Result<()> {
        let turn = &self.next.discussion.state.current_turn;
        let ctx = TurnContext {
            previous: turn.participant_id.clone(),
            contributed: turn.messages_in_turn > 0,
            reason,
            now: self.now,
        };
        let selection = select_next(
            &self.next.discussion.turn_strategy,
            &self.next.strategy_state,
            &self.next.discussion.participants,
            &ctx,
            &self.next.scores,
        );
        self.next.strategy_state = selection.state;

        for id in selection.deactivated {
            if self.next.discussion.participants.leave(&id).is_ok() {
                self.next.strategy_state.forget(&id);
                self.refresh_active_count();
                self.emit(
                    Some(id),
                    EventPayload::ParticipantLeft {
                        reason: LeaveReason::MaxSkips,
                    },
                );
            }
        }

        let previous = ctx.previous;
        match selection.outcome {
            TurnSelection::Speaker(id) => {
                let turn = &mut self.next.discussion.state.current_turn;
                turn.participant_id = Some(id.clone());
                turn.started_at = Some(self.now);
                turn.turn_number += 1;
                turn.messages_in_turn = 0;
                self.arm_turn();
                self.emit_turn_changed(previous, Some(id), reason, selection.fallback);
            }
            TurnSelection::Awaiting => {
                self.clear_holder();
                self.arm_turn();
                if previous.is_some() {
                    self.emit_turn_changed(previous, None, reason, selection.fallback);
                }
            }
            TurnSelection::Exhausted => {
                self.clear_holder();
                if previous.is_some() {
                    self.emit_turn_changed(previous, None, reason, selection.fallback);
                }
                self.finish(None, Some("no eligible participants remain".to_string()));
            }
        }
        Ok(())
    }

    fn clear_holder(&mut self) {
        let turn = &mut self.next.discussion.state.current_turn;
        turn.participant_id = None;
        turn.started_at = None;
        turn.expected_end_at = None;
        turn.messages_in_turn = 0;
    }

    fn emit_turn_changed(
        &mut self,
        previous: Option<ParticipantId>,
        current: Option<ParticipantId>,
        reason: TurnEndReason,
        fallback: bool,
    ) {
        let state = &self.next.discussion.state;
        let payload = EventPayload::TurnChanged {
            previous,
            current: current.clone(),
            turn_number: state.current_turn.turn_number,
            reason,
            phase: state.phase,
            expected_end_at: state.current_turn.expected_end_at,
            fallback,
        };
        self.emit(current, payload);
    }

    /// Normal end: status `completed`, phase `conclusion`.
    ///
    /// Synthesis has no work of its own here, so the phase passes straight
    /// through it.
    fn finish(&mut self, actor: Option<ParticipantId>, reason: Option<String>) {
        let from = self.status();
        let d = &mut self.next.discussion;
        d.state.phase = DiscussionPhase::Conclusion;
        d.status = DiscussionStatus::Completed;
        d.ended_at = Some(self.now);
        self.clear_holder();
        self.disarm();
        self.emit_status(actor, from, reason);
    }

    /// Conclude if a size or time limit has been reached.
    fn check_limits(&mut self) -> bool {
        let d = &self.next.discussion;
        let reason = if d
            .settings
            .max_messages
            .is_some_and(|max| d.state.message_count >= max)
        {
            Some("max_messages reached")
        } else if self.duration_exceeded() {
            Some("max_duration reached")
        } else {
            None
        };
        match reason {
            Some(reason) => {
                self.finish(None, Some(reason.to_string()));
                true
            }
            None => false,
        }
    }

    // ---------- operations ----------

    fn start(&mut self) -> Result<()> {
        self.require_status(&[DiscussionStatus::Draft], "start")?;
        if self.next.discussion.participants.eligible().is_empty() {
            return Err(OrchestratorError::StrategyExhausted {
                context: self.before.clone(),
            });
        }
        let d = &mut self.next.discussion;
        d.status = DiscussionStatus::Active;
        d.started_at = Some(self.now);
        self.emit_status(None, DiscussionStatus::Draft, None);
        self.advance(TurnEndReason::Start)
    }

    fn pause(&mut self, reason: Option<String>) -> Result<()> {
        self.require_status(&[DiscussionStatus::Active], "pause")?;
        self.next.discussion.status = DiscussionStatus::Paused;
        self.disarm();
        self.emit_status(None, DiscussionStatus::Active, reason);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.require_status(&[DiscussionStatus::Paused], "resume")?;
        self.next.discussion.status = DiscussionStatus::Active;
        self.emit_status(None, DiscussionStatus::Paused, None);
        if self.check_limits() {
            return Ok(());
        }
        if self.holder().is_some() {
            self.next.discussion.state.current_turn.started_at = Some(self.now);
            self.arm_turn();
            Ok(())
        } else {
            // The floor may have opened while paused.
            self.advance(TurnEndReason::Resumed)
        }
    }

    fn cancel(&mut self, reason: Option<String>, compensate: bool) -> Result<()> {
        match self.status() {
            DiscussionStatus::Cancelled => return Ok(()),
            DiscussionStatus::Completed | DiscussionStatus::Archived => {
                return Err(self.invalid_state(format!("cannot cancel once {}", self.status())));
            }
            _ => {}
        }
        let from = self.status();
        let d = &mut self.next.discussion;
        d.status = DiscussionStatus::Cancelled;
        d.ended_at = Some(self.now);
        if compensate {
            d.state.cancel_open_action_items();
            self.next.strategy_state.clear_pending();
        }
        self.disarm();
        self.emit_status(None, from, reason);
        Ok(())
    }

    fn conclude_by(&mut self, actor: &ParticipantId, reason: Option<String>) -> Result<()> {
        self.require_status(
            &[DiscussionStatus::Active, DiscussionStatus::Paused],
            "conclude",
        )?;
        self.require_permission(actor, ParticipantAction::EndDiscussion, "end the discussion")?;
        self.finish(Some(actor.clone()), reason);
        Ok(())
    }

    fn archive(&mut self) -> Result<()> {
        self.require_status(
            &[DiscussionStatus::Completed, DiscussionStatus::Cancelled],
            "archive",
        )?;
        let from = self.status();
        self.next.discussion.status = DiscussionStatus::Archived;
        self.emit_status(None, from, None);
        Ok(())
    }

    fn join(&mut self, request: NewParticipant, invited_by: Option<&ParticipantId>) -> Result<()> {
        self.require_not_terminal("join")?;
        if let Some(inviter) = invited_by {
            if !self.next.discussion.settings.allow_invites {
                return Err(self.not_eligible(inviter, "invites are disabled for this discussion"));
            }
            self.require_permission(inviter, ParticipantAction::Invite, "invite others")?;
        }
        let registry = &self.next.discussion.participants;
        let max = self.next.discussion.settings.max_participants;
        if registry.active_count() >= max {
            return Err(self.not_eligible(
                &request.id,
                format!("discussion is full ({} active participants)", max),
            ));
        }

        let role = request.role;
        let joined = self
            .next
            .discussion
            .participants
            .join(request, self.now)
            .map_err(|e| match e {
                RegistryError::AlreadyActive(_) | RegistryError::DuplicateId(_) => {
                    self.conflict(e.to_string())
                }
                RegistryError::Unknown(_) | RegistryError::NotActive(_) => {
                    self.invalid_state(e.to_string())
                }
            })?;
        let role = self
            .next
            .discussion
            .participants
            .get(&joined.participant_id)
            .map_or(role, |p| p.role);
        self.refresh_active_count();
        self.emit(
            Some(joined.participant_id),
            EventPayload::ParticipantJoined {
                role,
                rejoined: joined.rejoined,
            },
        );
        Ok(())
    }

    fn leave(&mut self, participant: &ParticipantId) -> Result<()> {
        self.require_not_terminal("leave")?;
        self.next
            .discussion
            .participants
            .leave(participant)
            .map_err(|e| match e {
                RegistryError::Unknown(id) => self.not_found("participant", id),
                other => self.not_eligible(participant, other.to_string()),
            })?;
        self.next.strategy_state.forget(participant);
        self.refresh_active_count();
        self.emit(
            Some(participant.clone()),
            EventPayload::ParticipantLeft {
                reason: LeaveReason::Left,
            },
        );

        let live = matches!(
            self.status(),
            DiscussionStatus::Active | DiscussionStatus::Paused
        );
        let held_turn = self.holder() == Some(participant);
        let floor_open = self.holder().is_none();
        if live && (held_turn || floor_open) {
            self.advance(TurnEndReason::ParticipantLeft)?;
        }
        Ok(())
    }

    fn submit_message(&mut self, participant: &ParticipantId, draft: MessageDraft) -> Result<()> {
        self.require_status(&[DiscussionStatus::Active], "send messages")?;
        self.require_permission(participant, ParticipantAction::SendMessage, "send messages")?;

        let holds_turn = self.holder() == Some(participant);
        if !holds_turn {
            if self.strategy().enforces_exclusive_turns() {
                return Err(self.turn_violation(participant));
            }
            self.claim_floor(participant)?;
        }

        let max_length = self.next.discussion.settings.max_message_length;
        let turn_number = self.next.discussion.state.current_turn.turn_number;
        let message = self
            .next
            .messages
            .append(
                &self.next.discussion.id,
                participant,
                turn_number,
                draft,
                max_length,
                self.now,
            )
            .map_err(|e| message_error(&self.before, e))?;
        let payload = EventPayload::MessageSent {
            message_id: message.id.clone(),
            message_type: message.message_type,
            turn_number,
            reply_to: message.reply_to.clone(),
            content: message.content.clone(),
        };

        let d = &mut self.next.discussion;
        d.participants.record_message(participant, self.now);
        d.state.message_count += 1;
        d.state.last_activity = Some(self.now);
        d.state.current_turn.messages_in_turn += 1;
        if d.state.phase == DiscussionPhase::Initialization {
            d.state.phase = DiscussionPhase::Discussion;
        }
        self.next.strategy_state.record_contribution(participant);
        self.emit(Some(participant.clone()), payload);

        if self.check_limits() {
            return Ok(());
        }
        if self.strategy().ends_turn_on_message() {
            self.advance(TurnEndReason::MessageCompleted)
        } else {
            self.rearm_response();
            Ok(())
        }
    }

    /// Free-Form: a non-holder speaks and takes the floor, cooldown permitting.
    fn claim_floor(&mut self, participant: &ParticipantId) -> Result<()> {
        if let TurnStrategyConfig::FreeForm(config) = self.strategy() {
            let cooldown = Duration::seconds(config.cooldown_period_secs as i64);
            if let Some(left) =
                self.next
                    .strategy_state
                    .free_form
                    .cooldown_remaining(participant, self.now, cooldown)
            {
                return Err(self.not_eligible(
                    participant,
                    format!("cooling down for another {}s", left.num_seconds().max(1)),
                ));
            }
        }

        let now = self.now;
        let previous = self.holder().cloned();
        let free_form = &mut self.next.strategy_state.free_form;
        if let Some(prev) = &previous {
            free_form.last_turn_at.insert(prev.clone(), now);
        }
        free_form.dequeue(participant);

        let turn = &mut self.next.discussion.state.current_turn;
        turn.participant_id = Some(participant.clone());
        turn.started_at = Some(now);
        turn.turn_number += 1;
        turn.messages_in_turn = 0;
        self.arm_turn();
        self.emit_turn_changed(previous, Some(participant.clone()), TurnEndReason::Claimed, false);
        Ok(())
    }

    fn pass(&mut self, participant: &ParticipantId) -> Result<()> {
        self.require_status(&[DiscussionStatus::Active], "pass")?;
        self.require_active_participant(participant)?;
        if self.holder() != Some(participant) {
            return Err(self.turn_violation(participant));
        }
        self.advance(TurnEndReason::Pass)
    }

    fn timeout(&mut self, kind: TimeoutKind) -> Result<()> {
        if self.check_limits() {
            return Ok(());
        }
        if self.holder().is_none() {
            // An open floor is only timed while speak requests wait out a cooldown.
            let queued = matches!(self.strategy(), TurnStrategyConfig::FreeForm(_))
                && !self.next.strategy_state.free_form.speak_queue.is_empty();
            if queued {
                return self.advance(TurnEndReason::SpeakRequest);
            }
            return Ok(());
        }
        let reason = match kind {
            TimeoutKind::Turn => TurnEndReason::Timeout,
            TimeoutKind::Response => TurnEndReason::ResponseTimeout,
        };
        self.advance(reason)
    }

    fn moderator_pick(&mut self, actor: &ParticipantId, target: &ParticipantId) -> Result<()> {
        let (moderator, require_approval) = match self.strategy() {
            TurnStrategyConfig::Moderated(c) => (c.moderator_id.clone(), c.require_approval),
            other => {
                return Err(self.invalid_state(format!(
                    "moderator picks need the moderated strategy, not {}",
                    other.kind()
                )));
            }
        };
        self.require_status(&[DiscussionStatus::Active], "pick a speaker")?;
        self.require_permission(actor, ParticipantAction::Moderate, "moderate")?;
        if actor != &moderator {
            return Err(self.not_eligible(
                actor,
                format!("only the discussion moderator {} picks speakers", moderator),
            ));
        }
        if !self.participant(target)?.can_take_turn() {
            return Err(self.not_eligible(target, "participant cannot take a turn"));
        }

        let moderated = &mut self.next.strategy_state.moderated;
        if require_approval {
            moderated.provisional_pick = Some(target.clone());
            Ok(())
        } else {
            moderated.provisional_pick = None;
            moderated.confirmed_pick = Some(target.clone());
            self.advance(TurnEndReason::ModeratorPick)
        }
    }

    fn confirm_pick(&mut self, actor: &ParticipantId) -> Result<()> {
        if !matches!(self.strategy(), TurnStrategyConfig::Moderated(_)) {
            return Err(self.invalid_state("only moderated discussions have picks to confirm"));
        }
        self.require_status(&[DiscussionStatus::Active], "confirm a pick")?;
        self.require_permission(actor, ParticipantAction::Moderate, "moderate")?;
        let moderated = &mut self.next.strategy_state.moderated;
        match moderated.provisional_pick.take() {
            Some(pick) => {
                moderated.confirmed_pick = Some(pick);
                self.advance(TurnEndReason::ModeratorPick)
            }
            None => Err(self.invalid_state("no pick is awaiting confirmation")),
        }
    }

    fn request_to_speak(&mut self, participant: &ParticipantId) -> Result<()> {
        if !matches!(self.strategy(), TurnStrategyConfig::FreeForm(_)) {
            return Err(self.invalid_state("speak requests need the free-form strategy"));
        }
        self.require_status(&[DiscussionStatus::Active], "request to speak")?;
        self.require_permission(participant, ParticipantAction::SendMessage, "send messages")?;
        if self.holder() == Some(participant) {
            return Err(self.conflict(format!("{} already holds the turn", participant)));
        }
        if !self.next.strategy_state.free_form.enqueue(participant) {
            return Err(self.conflict(format!("{} is already waiting to speak", participant)));
        }
        if self.holder().is_none() {
            self.advance(TurnEndReason::SpeakRequest)?;
        }
        Ok(())
    }

    fn edit_message(
        &mut self,
        actor: &ParticipantId,
        message_id: &MessageId,
        content: String,
        reason: Option<String>,
    ) -> Result<()> {
        self.require_not_terminal("edit messages")?;
        self.require_author_or_moderator(actor, message_id)?;
        let max_length = self.next.discussion.settings.max_message_length;
        self.next
            .messages
            .edit(message_id, content, reason.clone(), max_length, self.now)
            .map_err(|e| message_error(&self.before, e))?;
        self.next.discussion.participants.touch(actor, self.now);
        self.emit(
            Some(actor.clone()),
            EventPayload::MessageEdited {
                message_id: message_id.clone(),
                reason,
            },
        );
        Ok(())
    }

    fn delete_message(&mut self, actor: &ParticipantId, message_id: &MessageId) -> Result<()> {
        self.require_not_terminal("delete messages")?;
        self.require_author_or_moderator(actor, message_id)?;
        self.next
            .messages
            .soft_delete(message_id, self.now)
            .map_err(|e| message_error(&self.before, e))?;
        self.emit(
            Some(actor.clone()),
            EventPayload::MessageDeleted {
                message_id: message_id.clone(),
            },
        );
        Ok(())
    }

    fn add_reaction(&mut self, actor: &ParticipantId, message_id: &MessageId, emoji: &str) -> Result<()> {
        self.require_not_terminal("react")?;
        self.require_active_participant(actor)?;
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(OrchestratorError::InvalidInput("emoji must not be empty".to_string()));
        }
        self.next
            .messages
            .add_reaction(message_id, actor, emoji, self.now)
            .map_err(|e| message_error(&self.before, e))?;
        self.emit(
            Some(actor.clone()),
            EventPayload::ReactionAdded {
                message_id: message_id.clone(),
                emoji: emoji.to_string(),
            },
        );
        Ok(())
    }

    fn typing(&mut self, participant: &ParticipantId, payload: EventPayload) -> Result<()> {
        self.require_status(&[DiscussionStatus::Active], "signal typing")?;
        self.require_permission(participant, ParticipantAction::SendMessage, "send messages")?;
        self.emit(Some(participant.clone()), payload);
        Ok(())
    }

    fn update_settings(&mut self, actor: &ParticipantId, settings: DiscussionSettings) -> Result<()> {
        self.require_not_terminal("update settings")?;
        self.require_permission(actor, ParticipantAction::Moderate, "change settings")?;
        settings.validate().map_err(OrchestratorError::InvalidInput)?;
        let active = self.next.discussion.participants.active_count();
        if settings.max_participants < active {
            return Err(OrchestratorError::InvalidInput(format!(
                "max_participants ({}) is below the {} active participants",
                settings.max_participants, active
            )));
        }

        let timing_changed = {
            let current = &self.next.discussion.settings;
            current.turn_timeout_secs != settings.turn_timeout_secs
                || current.response_timeout_secs != settings.response_timeout_secs
                || current.max_duration_minutes != settings.max_duration_minutes
        };
        self.next.discussion.settings = settings.clone();
        self.emit(Some(actor.clone()), EventPayload::SettingsUpdated { settings });

        if self.status() == DiscussionStatus::Active {
            if self.check_limits() {
                return Ok(());
            }
            if timing_changed {
                self.arm_turn();
            }
        }
        Ok(())
    }
}

fn message_error(context: &TurnSnapshot, err: MessageLogError) -> OrchestratorError {
    let context = context.clone();
    match err {
        MessageLogError::EmptyContent | MessageLogError::TooLong { .. } => {
            OrchestratorError::InvalidInput(err.to_string())
        }
        MessageLogError::UnknownMessage(id) => OrchestratorError::NotFound {
            resource: "message",
            id: id.to_string(),
            context,
        },
        MessageLogError::Deleted(_) => OrchestratorError::InvalidState {
            message: err.to_string(),
            context,
        },
        MessageLogError::DuplicateReaction { .. } => OrchestratorError::Conflict {
            message: err.to_string(),
            context,
        },
    }
}

fn earliest(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
