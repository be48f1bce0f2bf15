//! Discussion aggregate and its lifecycle enums

use super::settings::DiscussionSettings;
use super::state::DiscussionState;
use crate::core::error::OrchestratorError;
use crate::core::id::DiscussionId;
use crate::participant::entities::NewParticipant;
use crate::participant::registry::ParticipantRegistry;
use crate::turn::config::TurnStrategyConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a discussion
///
/// ```text
/// draft ──start──▶ active ◀──▶ paused
///   │                 │          │
///   └──cancel──▶ cancelled ◀─────┤
///                     │          │
///        completed ◀──┴──────────┘
///            │
///            └──▶ archived ◀── cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
    Archived,
}

impl DiscussionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionStatus::Draft => "draft",
            DiscussionStatus::Active => "active",
            DiscussionStatus::Paused => "paused",
            DiscussionStatus::Completed => "completed",
            DiscussionStatus::Cancelled => "cancelled",
            DiscussionStatus::Archived => "archived",
        }
    }

    /// Terminal statuses forbid any further mutation of state or participants.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DiscussionStatus::Completed | DiscussionStatus::Cancelled | DiscussionStatus::Archived
        )
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: DiscussionStatus) -> bool {
        use DiscussionStatus::*;
        matches!(
            (self, next),
            (Draft, Active)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Completed)
                | (Paused, Completed)
                | (Draft, Cancelled)
                | (Active, Cancelled)
                | (Paused, Cancelled)
                | (Completed, Archived)
                | (Cancelled, Archived)
        )
    }
}

impl std::fmt::Display for DiscussionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse lifecycle stage of the conversation itself, orthogonal to status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionPhase {
    /// Started (or not yet started) but nobody has spoken
    #[default]
    Initialization,
    /// Messages are flowing
    Discussion,
    /// Wrapping up after the last turn
    Synthesis,
    /// Finished
    Conclusion,
}

impl DiscussionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionPhase::Initialization => "initialization",
            DiscussionPhase::Discussion => "discussion",
            DiscussionPhase::Synthesis => "synthesis",
            DiscussionPhase::Conclusion => "conclusion",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DiscussionPhase::Initialization => "Initialization",
            DiscussionPhase::Discussion => "Discussion",
            DiscussionPhase::Synthesis => "Synthesis",
            DiscussionPhase::Conclusion => "Conclusion",
        }
    }
}

impl std::fmt::Display for DiscussionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionVisibility {
    #[default]
    Private,
    Team,
    Organization,
    Public,
}

/// Discussion aggregate root (Entity)
///
/// Only the orchestrator holds a mutable `Discussion`; everyone else sees it
/// through shared references or snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: DiscussionId,
    pub title: String,
    pub topic: String,
    pub description: Option<String>,
    pub created_by: String,
    pub status: DiscussionStatus,
    pub visibility: DiscussionVisibility,
    pub settings: DiscussionSettings,
    pub turn_strategy: TurnStrategyConfig,
    pub state: DiscussionState,
    pub participants: ParticipantRegistry,
    pub tags: Vec<String>,
    pub objectives: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Request to create a discussion in `draft`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDiscussion {
    pub id: Option<DiscussionId>,
    pub title: String,
    pub topic: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub visibility: DiscussionVisibility,
    #[serde(default)]
    pub settings: Option<DiscussionSettings>,
    #[serde(default)]
    pub turn_strategy: Option<TurnStrategyConfig>,
    pub initial_participants: Vec<NewParticipant>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
}

impl NewDiscussion {
    pub const MAX_TITLE_LEN: usize = 255;
    pub const MAX_TOPIC_LEN: usize = 1000;

    pub fn new(title: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            topic: topic.into(),
            description: None,
            created_by: String::new(),
            visibility: DiscussionVisibility::default(),
            settings: None,
            turn_strategy: None,
            initial_participants: Vec::new(),
            tags: Vec::new(),
            objectives: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<DiscussionId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_participant(mut self, participant: NewParticipant) -> Self {
        self.initial_participants.push(participant);
        self
    }

    pub fn with_settings(mut self, settings: DiscussionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_strategy(mut self, strategy: TurnStrategyConfig) -> Self {
        self.turn_strategy = Some(strategy);
        self
    }

    pub fn with_objectives(mut self, objectives: Vec<String>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn created_by(mut self, creator: impl Into<String>) -> Self {
        self.created_by = creator.into();
        self
    }
}

impl Discussion {
    /// Build a `draft` discussion from a creation request.
    ///
    /// Requires a non-empty title and topic within length limits, valid
    /// settings, at least two initial participants with distinct agents, and a
    /// strategy configuration consistent with the roster.
    pub fn create(request: NewDiscussion, now: DateTime<Utc>) -> Result<Self, OrchestratorError> {
        let invalid = |msg: String| Err(OrchestratorError::InvalidInput(msg));

        let title = request.title.trim();
        if title.is_empty() || title.chars().count() > NewDiscussion::MAX_TITLE_LEN {
            return invalid(format!(
                "title must be 1-{} characters",
                NewDiscussion::MAX_TITLE_LEN
            ));
        }
        let topic = request.topic.trim();
        if topic.is_empty() || topic.chars().count() > NewDiscussion::MAX_TOPIC_LEN {
            return invalid(format!(
                "topic must be 1-{} characters",
                NewDiscussion::MAX_TOPIC_LEN
            ));
        }

        let settings = request.settings.unwrap_or_default();
        settings.validate().map_err(OrchestratorError::InvalidInput)?;

        if request.initial_participants.len() < DiscussionSettings::MIN_PARTICIPANTS {
            return invalid(format!(
                "at least {} initial participants are required, got {}",
                DiscussionSettings::MIN_PARTICIPANTS,
                request.initial_participants.len()
            ));
        }
        if request.initial_participants.len() > settings.max_participants {
            return invalid(format!(
                "{} initial participants exceed max_participants ({})",
                request.initial_participants.len(),
                settings.max_participants
            ));
        }

        let mut participants = ParticipantRegistry::new();
        for participant in request.initial_participants {
            participants
                .join(participant, now)
                .map_err(|e| OrchestratorError::InvalidInput(e.to_string()))?;
        }

        let turn_strategy = request.turn_strategy.unwrap_or_default().normalized();
        turn_strategy
            .validate(&participants)
            .map_err(OrchestratorError::InvalidInput)?;

        let state = DiscussionState {
            active_participants: participants.active_count(),
            ..DiscussionState::default()
        };

        Ok(Self {
            id: request.id.unwrap_or_else(DiscussionId::generate),
            title: title.to_string(),
            topic: topic.to_string(),
            description: request.description,
            created_by: request.created_by,
            status: DiscussionStatus::Draft,
            visibility: request.visibility,
            settings,
            turn_strategy,
            state,
            participants,
            tags: request.tags,
            objectives: request.objectives,
            created_at: now,
            started_at: None,
            ended_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::config::{ModeratedConfig, TurnStrategyConfig};

    fn request() -> NewDiscussion {
        NewDiscussion::new("Release plan", "How do we ship 2.0?")
            .with_participant(NewParticipant::new("a", "agent-a"))
            .with_participant(NewParticipant::new("b", "agent-b"))
    }

    #[test]
    fn test_status_transitions() {
        use DiscussionStatus::*;
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Paused));
        assert!(!Draft.can_transition_to(Paused));
        assert!(Completed.can_transition_to(Archived));
        assert!(!Archived.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(DiscussionStatus::Completed.is_terminal());
        assert!(DiscussionStatus::Cancelled.is_terminal());
        assert!(DiscussionStatus::Archived.is_terminal());
        assert!(!DiscussionStatus::Paused.is_terminal());
    }

    #[test]
    fn test_create_draft_with_defaults() {
        let discussion = Discussion::create(request(), Utc::now()).unwrap();
        assert_eq!(discussion.status, DiscussionStatus::Draft);
        assert_eq!(discussion.state.phase, DiscussionPhase::Initialization);
        assert_eq!(discussion.state.active_participants, 2);
        assert!(matches!(
            discussion.turn_strategy,
            TurnStrategyConfig::RoundRobin(_)
        ));
    }

    #[test]
    fn test_create_requires_two_participants() {
        let lonely = NewDiscussion::new("t", "topic")
            .with_participant(NewParticipant::new("a", "agent-a"));
        let err = Discussion::create(lonely, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_create_rejects_duplicate_agents() {
        let dup = NewDiscussion::new("t", "topic")
            .with_participant(NewParticipant::new("a", "agent-a"))
            .with_participant(NewParticipant::new("b", "agent-a"));
        assert!(Discussion::create(dup, Utc::now()).is_err());
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let mut blank = request();
        blank.title = "   ".to_string();
        assert!(Discussion::create(blank, Utc::now()).is_err());
    }

    #[test]
    fn test_create_rejects_unknown_moderator() {
        let moderated = request().with_strategy(TurnStrategyConfig::Moderated(
            ModeratedConfig::new("ghost"),
        ));
        assert!(Discussion::create(moderated, Utc::now()).is_err());
    }
}
