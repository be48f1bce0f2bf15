//! RunScenario use case
//!
//! Drives one discussion from start to finish with scripted participants.
//! Each step the scenario asks who would act next under the discussion's
//! strategy:
//!
//! - a turn holder speaks, or passes if they are silent
//! - in moderated discussions the moderator picks (and confirms) the least
//!   heard participant once the holder has spoken
//! - in free-form discussions the least heard participant out of cooldown
//!   claims the floor
//!
//! When every participant has had `rounds` opportunities the discussion is
//! concluded by someone allowed to, or cancelled otherwise.

use crate::config::ScenarioParams;
use crate::discussion::{DiscussionHandle, DiscussionRuntimeError};
use crate::use_cases::discussion_hub::DiscussionHub;
use colloquy_domain::util::preview;
use colloquy_domain::{
    DiscussionStatus, MessageDraft, NewDiscussion, OrchestratorSnapshot, ParticipantId,
    TurnStrategyConfig,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RunScenarioError {
    #[error(transparent)]
    Runtime(#[from] DiscussionRuntimeError),

    #[error("Scenario stalled: {0}")]
    Stalled(String),
}

/// Input for the scenario
#[derive(Debug, Clone)]
pub struct RunScenarioInput {
    pub discussion: NewDiscussion,
    pub params: ScenarioParams,
}

impl RunScenarioInput {
    pub fn new(discussion: NewDiscussion) -> Self {
        Self {
            discussion,
            params: ScenarioParams::default(),
        }
    }

    pub fn with_params(mut self, params: ScenarioParams) -> Self {
        self.params = params;
        self
    }
}

/// What happened
#[derive(Debug, Clone)]
pub struct RunScenarioOutput {
    pub snapshot: OrchestratorSnapshot,
    pub steps: usize,
    pub messages_sent: usize,
    pub passes: usize,
    /// Operations the orchestrator refused along the way
    pub rejected: usize,
}

/// The next scripted action
enum Action {
    Speak(ParticipantId),
    Pass(ParticipantId),
    Pick {
        moderator: ParticipantId,
        target: ParticipantId,
        confirm: bool,
    },
    /// Everyone who could speak is cooling down
    Wait(std::time::Duration),
}

pub struct RunScenarioUseCase {
    hub: Arc<DiscussionHub>,
}

impl RunScenarioUseCase {
    pub fn new(hub: Arc<DiscussionHub>) -> Self {
        Self { hub }
    }

    pub async fn execute(&self, input: RunScenarioInput) -> Result<RunScenarioOutput, RunScenarioError> {
        let params = input.params;
        let topic = input.discussion.topic.clone();
        let roster = input.discussion.initial_participants.len();
        let handle = self.hub.create(input.discussion)?;
        info!(
            discussion = %handle.id(),
            rounds = params.rounds,
            participants = roster,
            "Running scenario"
        );

        handle.start().await?;

        let budget = params.rounds * roster;
        let mut heard: HashMap<ParticipantId, usize> = HashMap::new();
        let mut output = RunScenarioOutput {
            snapshot: handle.snapshot().await?,
            steps: 0,
            messages_sent: 0,
            passes: 0,
            rejected: 0,
        };

        while output.steps < params.max_steps && output.messages_sent + output.passes < budget {
            let snapshot = handle.snapshot().await?;
            if snapshot.discussion.status.is_terminal() {
                break;
            }
            output.steps += 1;

            let action = next_action(&snapshot, &params, &heard)?;
            let result = match action {
                Action::Speak(participant) => {
                    let n = heard.get(&participant).copied().unwrap_or(0) + 1;
                    let draft = MessageDraft::new(format!(
                        "{} on \"{}\": point {}",
                        participant,
                        preview(&topic, 60),
                        n
                    ));
                    let result = handle.submit_message(&participant, draft).await;
                    if result.is_ok() {
                        output.messages_sent += 1;
                        *heard.entry(participant).or_default() += 1;
                    }
                    result
                }
                Action::Pass(participant) => {
                    let result = handle.pass_turn(&participant).await;
                    if result.is_ok() {
                        output.passes += 1;
                        *heard.entry(participant).or_default() += 1;
                    }
                    result
                }
                Action::Pick {
                    moderator,
                    target,
                    confirm,
                } => {
                    let picked = handle.moderator_pick(&moderator, &target).await;
                    if confirm && picked.is_ok() {
                        handle.confirm_pick(&moderator).await
                    } else {
                        picked
                    }
                }
                Action::Wait(delay) => {
                    debug!(?delay, "Everyone is cooling down");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            match result {
                Ok(_) => {}
                Err(DiscussionRuntimeError::Rejected(e)) => {
                    warn!(code = e.code(), error = %e, "Scenario step rejected");
                    output.rejected += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        wrap_up(&handle).await?;
        output.snapshot = handle.snapshot().await?;
        info!(
            discussion = %handle.id(),
            status = %output.snapshot.discussion.status,
            messages = output.messages_sent,
            passes = output.passes,
            "Scenario finished"
        );
        Ok(output)
    }
}

fn next_action(
    snapshot: &OrchestratorSnapshot,
    params: &ScenarioParams,
    heard: &HashMap<ParticipantId, usize>,
) -> Result<Action, RunScenarioError> {
    let discussion = &snapshot.discussion;
    let turn = &discussion.state.current_turn;
    let least_heard = |exclude: Option<&ParticipantId>| {
        discussion
            .participants
            .eligible()
            .into_iter()
            .filter(|p| Some(&p.id) != exclude)
            .min_by_key(|p| heard.get(&p.id).copied().unwrap_or(0))
            .map(|p| p.id.clone())
    };

    match &discussion.turn_strategy {
        TurnStrategyConfig::FreeForm(config) => {
            let now = Utc::now();
            let cooldown = chrono::Duration::seconds(config.cooldown_period_secs as i64);
            let free_form = &snapshot.strategy_state.free_form;
            let mut candidates: Vec<_> = discussion
                .participants
                .eligible()
                .into_iter()
                .filter(|p| !params.is_silent(&p.id))
                .collect();
            if candidates.is_empty() {
                return Err(RunScenarioError::Stalled("every participant is silent".to_string()));
            }
            candidates.sort_by_key(|p| heard.get(&p.id).copied().unwrap_or(0));
            let ready = candidates.iter().find(|p| {
                turn.participant_id.as_ref() == Some(&p.id)
                    || !free_form.in_cooldown(&p.id, now, cooldown)
            });
            if let Some(p) = ready {
                return Ok(Action::Speak(p.id.clone()));
            }
            let wait = candidates
                .iter()
                .filter_map(|p| free_form.cooldown_remaining(&p.id, now, cooldown))
                .min()
                .and_then(|d| d.to_std().ok())
                .unwrap_or_default();
            Ok(Action::Wait(wait))
        }
        TurnStrategyConfig::Moderated(config) => match &turn.participant_id {
            Some(holder) if turn.messages_in_turn == 0 => Ok(holder_action(holder, params)),
            holder => {
                let target = least_heard(holder.as_ref())
                    .or_else(|| holder.clone())
                    .ok_or_else(|| RunScenarioError::Stalled("nobody left to pick".to_string()))?;
                Ok(Action::Pick {
                    moderator: config.moderator_id.clone(),
                    target,
                    confirm: config.require_approval,
                })
            }
        },
        _ => match &turn.participant_id {
            Some(holder) => Ok(holder_action(holder, params)),
            None => Err(RunScenarioError::Stalled(format!(
                "no turn holder under {}",
                discussion.turn_strategy.kind()
            ))),
        },
    }
}

fn holder_action(holder: &ParticipantId, params: &ScenarioParams) -> Action {
    if params.is_silent(holder) {
        Action::Pass(holder.clone())
    } else {
        Action::Speak(holder.clone())
    }
}

async fn wrap_up(handle: &DiscussionHandle) -> Result<(), DiscussionRuntimeError> {
    let discussion = handle.discussion().await?;
    if !matches!(
        discussion.status,
        DiscussionStatus::Active | DiscussionStatus::Paused
    ) {
        return Ok(());
    }
    let closer = discussion
        .participants
        .list_active()
        .into_iter()
        .find(|p| p.permissions.can_end_discussion)
        .map(|p| p.id.clone());
    match closer {
        Some(closer) => {
            handle
                .conclude(&closer, Some("scenario complete".to_string()))
                .await?
        }
        None => {
            handle
                .cancel(Some("scenario complete".to_string()), false)
                .await?
        }
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use colloquy_domain::{
        DiscussionEventType, DiscussionSettings, FreeFormConfig, LeaveReason, ModeratedConfig,
        NewParticipant, ParticipantRole, RoundRobinConfig,
    };

    fn base() -> NewDiscussion {
        NewDiscussion::new("Roadmap", "What should we build next?")
            .with_participant(NewParticipant::new("alice", "agent-a"))
            .with_participant(NewParticipant::new("bob", "agent-b"))
            .with_participant(NewParticipant::new("carol", "agent-c"))
    }

    fn use_case() -> (Arc<DiscussionHub>, RunScenarioUseCase) {
        let hub = Arc::new(DiscussionHub::new(
            RuntimeConfig::default().with_snapshot_on_commit(false),
        ));
        (hub.clone(), RunScenarioUseCase::new(hub))
    }

    #[tokio::test]
    async fn test_round_robin_everyone_speaks() {
        let (hub, use_case) = use_case();
        let input = RunScenarioInput::new(base()).with_params(ScenarioParams::default().with_rounds(2));

        let output = use_case.execute(input).await.unwrap();
        assert_eq!(output.messages_sent, 6);
        assert_eq!(output.passes, 0);
        assert_eq!(output.rejected, 0);
        // Nobody may end the discussion, so it is cancelled.
        assert_eq!(output.snapshot.discussion.status, DiscussionStatus::Cancelled);
        for participant in output.snapshot.discussion.participants.iter() {
            assert_eq!(participant.message_count, 2);
        }
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_silent_participant_is_deactivated() {
        let (hub, use_case) = use_case();
        let mut events = hub.event_channel("test");
        let discussion = base().with_strategy(TurnStrategyConfig::RoundRobin(RoundRobinConfig {
            skip_inactive: true,
            max_skips: 2,
        }));
        let input = RunScenarioInput::new(discussion)
            .with_params(ScenarioParams::default().with_rounds(3).with_silent("carol"));

        let output = use_case.execute(input).await.unwrap();
        assert_eq!(output.passes, 2);
        let carol = output
            .snapshot
            .discussion
            .participants
            .get(&ParticipantId::new("carol"))
            .unwrap();
        assert!(!carol.is_active);

        hub.shutdown().await;
        let mut deactivated = false;
        while let Some(event) = events.recv().await {
            if let colloquy_domain::EventPayload::ParticipantLeft { reason } = &event.payload {
                deactivated |= *reason == LeaveReason::MaxSkips;
            }
            assert_ne!(event.event_type(), DiscussionEventType::MessageEdited);
        }
        assert!(deactivated);
    }

    #[tokio::test]
    async fn test_moderated_scenario_concludes() {
        let (hub, use_case) = use_case();
        let discussion = NewDiscussion::new("Triage", "Which bugs block the release?")
            .with_participant(NewParticipant::new("mod", "agent-m").with_role(ParticipantRole::Moderator))
            .with_participant(NewParticipant::new("alice", "agent-a"))
            .with_participant(NewParticipant::new("bob", "agent-b"))
            .with_strategy(TurnStrategyConfig::Moderated(ModeratedConfig::new("mod")));
        let input = RunScenarioInput::new(discussion).with_params(ScenarioParams::default().with_rounds(1));

        let output = use_case.execute(input).await.unwrap();
        assert_eq!(output.messages_sent, 3);
        assert_eq!(output.rejected, 0);
        assert_eq!(output.snapshot.discussion.status, DiscussionStatus::Completed);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_free_form_without_cooldown() {
        let (hub, use_case) = use_case();
        let discussion = base()
            .with_settings(DiscussionSettings::default())
            .with_strategy(TurnStrategyConfig::FreeForm(FreeFormConfig {
                cooldown_period_secs: 0,
            }));
        let input = RunScenarioInput::new(discussion).with_params(ScenarioParams::default().with_rounds(2));

        let output = use_case.execute(input).await.unwrap();
        assert_eq!(output.messages_sent, 6);
        assert_eq!(output.rejected, 0);
        assert_eq!(output.snapshot.messages.len(), 6);
        hub.shutdown().await;
    }
}
