//! Participant registry for one discussion
//!
//! Keeps every participant that ever joined, in join order. Departed
//! participants stay in the registry with `is_active = false` so their history
//! (message counts, rotation slot) survives a later re-join.

use super::entities::{DiscussionParticipant, NewParticipant, ParticipantAction};
use crate::core::id::{AgentId, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry-level failures, mapped to orchestrator errors by the state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("agent {0} is already an active participant")]
    AlreadyActive(AgentId),

    #[error("participant id {0} is already taken by another agent")]
    DuplicateId(ParticipantId),

    #[error("unknown participant {0}")]
    Unknown(ParticipantId),

    #[error("participant {0} is not active")]
    NotActive(ParticipantId),
}

/// Result of a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub participant_id: ParticipantId,
    /// True when a previously departed participant was reactivated
    pub rejoined: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRegistry {
    participants: Vec<DiscussionParticipant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant, or reactivate a departed one for the same agent.
    pub fn join(
        &mut self,
        request: NewParticipant,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, RegistryError> {
        if let Some(existing) = self
            .participants
            .iter_mut()
            .find(|p| p.agent_id == request.agent_id)
        {
            if existing.is_active {
                return Err(RegistryError::AlreadyActive(request.agent_id));
            }
            existing.is_active = true;
            existing.last_active_at = now;
            return Ok(JoinOutcome {
                participant_id: existing.id.clone(),
                rejoined: true,
            });
        }

        if self.participants.iter().any(|p| p.id == request.id) {
            return Err(RegistryError::DuplicateId(request.id));
        }

        let participant = request.into_participant(now);
        let participant_id = participant.id.clone();
        self.participants.push(participant);
        Ok(JoinOutcome {
            participant_id,
            rejoined: false,
        })
    }

    /// Mark a participant inactive. History is retained.
    pub fn leave(&mut self, id: &ParticipantId) -> Result<(), RegistryError> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| RegistryError::Unknown(id.clone()))?;
        if !participant.is_active {
            return Err(RegistryError::NotActive(id.clone()));
        }
        participant.is_active = false;
        Ok(())
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&DiscussionParticipant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn find_by_agent(&self, agent_id: &AgentId) -> Option<&DiscussionParticipant> {
        self.participants.iter().find(|p| &p.agent_id == agent_id)
    }

    /// Every participant ever registered, ordered by `joined_at` (stable on ties).
    pub fn join_order(&self) -> Vec<&DiscussionParticipant> {
        let mut all: Vec<_> = self.participants.iter().collect();
        all.sort_by_key(|p| p.joined_at);
        all
    }

    /// Active participants ordered by `joined_at` ascending.
    pub fn list_active(&self) -> Vec<&DiscussionParticipant> {
        self.join_order().into_iter().filter(|p| p.is_active).collect()
    }

    /// Active participants allowed to send messages, in join order.
    pub fn eligible(&self) -> Vec<&DiscussionParticipant> {
        self.join_order()
            .into_iter()
            .filter(|p| p.can_take_turn())
            .collect()
    }

    /// Capability check. Unknown or inactive participants can do nothing.
    pub fn can_act(&self, id: &ParticipantId, action: ParticipantAction) -> bool {
        self.get(id)
            .is_some_and(|p| p.is_active && p.permissions.allows(action))
    }

    pub fn active_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_active).count()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscussionParticipant> {
        self.participants.iter()
    }

    /// Count a message and refresh activity.
    pub(crate) fn record_message(&mut self, id: &ParticipantId, now: DateTime<Utc>) {
        if let Some(p) = self.participants.iter_mut().find(|p| &p.id == id) {
            p.message_count += 1;
            p.last_active_at = now;
        }
    }

    pub(crate) fn touch(&mut self, id: &ParticipantId, now: DateTime<Utc>) {
        if let Some(p) = self.participants.iter_mut().find(|p| &p.id == id) {
            p.last_active_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::entities::ParticipantRole;
    use chrono::Duration;

    fn registry_abc() -> (ParticipantRegistry, DateTime<Utc>) {
        let t0 = Utc::now();
        let mut registry = ParticipantRegistry::new();
        registry.join(NewParticipant::new("a", "agent-a"), t0).unwrap();
        registry
            .join(NewParticipant::new("b", "agent-b"), t0 + Duration::seconds(1))
            .unwrap();
        registry
            .join(NewParticipant::new("c", "agent-c"), t0 + Duration::seconds(2))
            .unwrap();
        (registry, t0)
    }

    fn ids(list: Vec<&DiscussionParticipant>) -> Vec<&str> {
        list.into_iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_duplicate_active_join_conflicts() {
        let (mut registry, t0) = registry_abc();
        let err = registry
            .join(NewParticipant::new("a2", "agent-a"), t0)
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyActive(AgentId::new("agent-a")));
    }

    #[test]
    fn test_rejoin_reactivates_and_keeps_slot() {
        let (mut registry, t0) = registry_abc();
        registry.leave(&ParticipantId::new("a")).unwrap();
        assert_eq!(ids(registry.list_active()), vec!["b", "c"]);

        let later = t0 + Duration::minutes(5);
        let outcome = registry
            .join(NewParticipant::new("ignored", "agent-a"), later)
            .unwrap();
        assert!(outcome.rejoined);
        assert_eq!(outcome.participant_id.as_str(), "a");

        let a = registry.get(&ParticipantId::new("a")).unwrap();
        assert!(a.is_active);
        assert_eq!(a.last_active_at, later);
        assert_eq!(ids(registry.list_active()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_leave_twice_is_rejected() {
        let (mut registry, _) = registry_abc();
        let b = ParticipantId::new("b");
        registry.leave(&b).unwrap();
        assert_eq!(registry.leave(&b), Err(RegistryError::NotActive(b)));
        assert!(matches!(
            registry.leave(&ParticipantId::new("zz")),
            Err(RegistryError::Unknown(_))
        ));
    }

    #[test]
    fn test_equal_join_times_keep_insertion_order() {
        let t0 = Utc::now();
        let mut registry = ParticipantRegistry::new();
        for id in ["x", "y", "z"] {
            registry
                .join(NewParticipant::new(id, format!("agent-{id}")), t0)
                .unwrap();
        }
        assert_eq!(ids(registry.list_active()), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_can_act_and_eligibility() {
        let t0 = Utc::now();
        let mut registry = ParticipantRegistry::new();
        registry
            .join(
                NewParticipant::new("mod", "agent-mod").with_role(ParticipantRole::Moderator),
                t0,
            )
            .unwrap();
        registry
            .join(
                NewParticipant::new("obs", "agent-obs").with_role(ParticipantRole::Observer),
                t0,
            )
            .unwrap();

        let moderator = ParticipantId::new("mod");
        let observer = ParticipantId::new("obs");
        assert!(registry.can_act(&moderator, ParticipantAction::Moderate));
        assert!(!registry.can_act(&observer, ParticipantAction::SendMessage));
        assert!(!registry.can_act(&ParticipantId::new("nobody"), ParticipantAction::SendMessage));
        assert_eq!(ids(registry.eligible()), vec!["mod"]);

        registry.leave(&moderator).unwrap();
        assert!(!registry.can_act(&moderator, ParticipantAction::Moderate));
    }
}
