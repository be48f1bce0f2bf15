//! Participant entities

use crate::core::id::{AgentId, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a participant within a discussion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    #[default]
    Participant,
    Moderator,
    Observer,
    Facilitator,
    Expert,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Participant => "participant",
            ParticipantRole::Moderator => "moderator",
            ParticipantRole::Observer => "observer",
            ParticipantRole::Facilitator => "facilitator",
            ParticipantRole::Expert => "expert",
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "participant" => Ok(ParticipantRole::Participant),
            "moderator" => Ok(ParticipantRole::Moderator),
            "observer" => Ok(ParticipantRole::Observer),
            "facilitator" => Ok(ParticipantRole::Facilitator),
            "expert" => Ok(ParticipantRole::Expert),
            _ => Err(format!(
                "Unknown role: {}. Valid: participant, moderator, observer, facilitator, expert",
                s
            )),
        }
    }
}

/// Something a participant may attempt to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantAction {
    SendMessage,
    Moderate,
    Invite,
    EndDiscussion,
}

/// Capability set of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPermissions {
    pub can_send_messages: bool,
    pub can_moderate: bool,
    pub can_invite_others: bool,
    pub can_end_discussion: bool,
}

impl Default for ParticipantPermissions {
    fn default() -> Self {
        Self::for_role(ParticipantRole::Participant)
    }
}

impl ParticipantPermissions {
    /// Default capability set for a role.
    ///
    /// Observers are read-only; moderators and facilitators steer the
    /// discussion and may end it.
    pub fn for_role(role: ParticipantRole) -> Self {
        match role {
            ParticipantRole::Participant | ParticipantRole::Expert => Self {
                can_send_messages: true,
                can_moderate: false,
                can_invite_others: false,
                can_end_discussion: false,
            },
            ParticipantRole::Moderator | ParticipantRole::Facilitator => Self {
                can_send_messages: true,
                can_moderate: true,
                can_invite_others: true,
                can_end_discussion: true,
            },
            ParticipantRole::Observer => Self {
                can_send_messages: false,
                can_moderate: false,
                can_invite_others: false,
                can_end_discussion: false,
            },
        }
    }

    pub fn allows(&self, action: ParticipantAction) -> bool {
        match action {
            ParticipantAction::SendMessage => self.can_send_messages,
            ParticipantAction::Moderate => self.can_moderate,
            ParticipantAction::Invite => self.can_invite_others,
            ParticipantAction::EndDiscussion => self.can_end_discussion,
        }
    }
}

/// A participant in one discussion (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionParticipant {
    pub id: ParticipantId,
    pub agent_id: AgentId,
    pub persona_id: Option<String>,
    pub user_id: Option<String>,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub message_count: u64,
    pub is_active: bool,
    pub permissions: ParticipantPermissions,
    /// Expertise keywords, matched against Expertise-Driven topic keywords
    #[serde(default)]
    pub expertise: Vec<String>,
}

impl DiscussionParticipant {
    /// Active and allowed to speak: the base eligibility every strategy starts from.
    pub fn can_take_turn(&self) -> bool {
        self.is_active && self.permissions.can_send_messages
    }
}

/// Request to add a participant (initial roster or a later join)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub id: ParticipantId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub role: ParticipantRole,
    #[serde(default)]
    pub persona_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Overrides the role's default permissions
    #[serde(default)]
    pub permissions: Option<ParticipantPermissions>,
    #[serde(default)]
    pub expertise: Vec<String>,
}

impl NewParticipant {
    pub fn new(id: impl Into<ParticipantId>, agent_id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            role: ParticipantRole::Participant,
            persona_id: None,
            user_id: None,
            permissions: None,
            expertise: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: ParticipantRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_permissions(mut self, permissions: ParticipantPermissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_expertise<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_persona(mut self, persona_id: impl Into<String>) -> Self {
        self.persona_id = Some(persona_id.into());
        self
    }

    pub(crate) fn into_participant(self, now: DateTime<Utc>) -> DiscussionParticipant {
        DiscussionParticipant {
            permissions: self
                .permissions
                .unwrap_or_else(|| ParticipantPermissions::for_role(self.role)),
            id: self.id,
            agent_id: self.agent_id,
            persona_id: self.persona_id,
            user_id: self.user_id,
            role: self.role,
            joined_at: now,
            last_active_at: now,
            message_count: 0,
            is_active: true,
            expertise: self.expertise,
        }
    }
}
