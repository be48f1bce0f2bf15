//! Turn strategy configuration
//!
//! One variant per strategy, each carrying only the parameters its algorithm
//! needs. Serialized with a `type` discriminator:
//!
//! ```
//! use colloquy_domain::turn::config::TurnStrategyConfig;
//!
//! let config: TurnStrategyConfig =
//!     serde_json::from_str(r#"{"type": "round_robin", "max_skips": 2}"#).unwrap();
//! assert_eq!(config.kind().as_str(), "round_robin");
//! ```

use crate::core::id::ParticipantId;
use crate::discussion::state::clamp_unit;
use crate::participant::entities::ParticipantAction;
use crate::participant::registry::ParticipantRegistry;
use serde::{Deserialize, Serialize};

/// Strategy discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStrategyKind {
    RoundRobin,
    Moderated,
    FreeForm,
    ContextAware,
    PriorityBased,
    ExpertiseDriven,
}

impl TurnStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStrategyKind::RoundRobin => "round_robin",
            TurnStrategyKind::Moderated => "moderated",
            TurnStrategyKind::FreeForm => "free_form",
            TurnStrategyKind::ContextAware => "context_aware",
            TurnStrategyKind::PriorityBased => "priority_based",
            TurnStrategyKind::ExpertiseDriven => "expertise_driven",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TurnStrategyKind::RoundRobin => "Round Robin",
            TurnStrategyKind::Moderated => "Moderated",
            TurnStrategyKind::FreeForm => "Free-Form",
            TurnStrategyKind::ContextAware => "Context-Aware",
            TurnStrategyKind::PriorityBased => "Priority-Based",
            TurnStrategyKind::ExpertiseDriven => "Expertise-Driven",
        }
    }
}

impl std::fmt::Display for TurnStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for TurnStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" | "rr" => Ok(TurnStrategyKind::RoundRobin),
            "moderated" => Ok(TurnStrategyKind::Moderated),
            "free_form" | "freeform" => Ok(TurnStrategyKind::FreeForm),
            "context_aware" => Ok(TurnStrategyKind::ContextAware),
            "priority_based" | "priority" => Ok(TurnStrategyKind::PriorityBased),
            "expertise_driven" | "expertise" => Ok(TurnStrategyKind::ExpertiseDriven),
            _ => Err(format!(
                "Unknown turn strategy: {}. Valid: round_robin, moderated, free_form, \
                 context_aware, priority_based, expertise_driven",
                s
            )),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRobinConfig {
    /// Deactivate participants who let `max_skips` consecutive turns pass silently
    pub skip_inactive: bool,
    /// Consecutive silent turns tolerated; 0 disables deactivation
    pub max_skips: u32,
}

impl Default for RoundRobinConfig {
    fn default() -> Self {
        Self {
            skip_inactive: true,
            max_skips: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeratedConfig {
    pub moderator_id: ParticipantId,
    /// Picks stay provisional until confirmed
    #[serde(default = "default_true")]
    pub require_approval: bool,
    /// Rotate in join order when no pick is queued
    #[serde(default)]
    pub auto_advance: bool,
}

impl ModeratedConfig {
    pub fn new(moderator_id: impl Into<ParticipantId>) -> Self {
        Self {
            moderator_id: moderator_id.into(),
            require_approval: true,
            auto_advance: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeFormConfig {
    /// Seconds a participant must wait after their turn before taking another
    pub cooldown_period_secs: u64,
}

impl Default for FreeFormConfig {
    fn default() -> Self {
        Self {
            cooldown_period_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAwareConfig {
    pub relevance_weight: f64,
    pub expertise_weight: f64,
    pub engagement_weight: f64,
    /// Candidates at or above this relevance are preferred when any exist
    pub relevance_threshold: f64,
}

impl Default for ContextAwareConfig {
    fn default() -> Self {
        Self {
            relevance_weight: 0.5,
            expertise_weight: 0.3,
            engagement_weight: 0.2,
            relevance_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPriority {
    pub participant_id: ParticipantId,
    pub priority: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityBasedConfig {
    pub priorities: Vec<ParticipantPriority>,
}

impl PriorityBasedConfig {
    pub const MAX_PRIORITY: u8 = 10;

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<ParticipantId>,
    {
        Self {
            priorities: pairs
                .into_iter()
                .map(|(id, priority)| ParticipantPriority {
                    participant_id: id.into(),
                    priority,
                })
                .collect(),
        }
    }

    /// Configured priority; unlisted participants rank lowest.
    pub fn priority_of(&self, id: &ParticipantId) -> u8 {
        self.priorities
            .iter()
            .find(|p| &p.participant_id == id)
            .map(|p| p.priority)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertiseDrivenConfig {
    pub topic_keywords: Vec<String>,
    pub expertise_threshold: f64,
}

impl Default for ExpertiseDrivenConfig {
    fn default() -> Self {
        Self {
            topic_keywords: Vec::new(),
            expertise_threshold: 0.8,
        }
    }
}

/// Turn-taking policy for a discussion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnStrategyConfig {
    RoundRobin(RoundRobinConfig),
    Moderated(ModeratedConfig),
    FreeForm(FreeFormConfig),
    ContextAware(ContextAwareConfig),
    PriorityBased(PriorityBasedConfig),
    ExpertiseDriven(ExpertiseDrivenConfig),
}

impl Default for TurnStrategyConfig {
    fn default() -> Self {
        TurnStrategyConfig::RoundRobin(RoundRobinConfig::default())
    }
}

impl TurnStrategyConfig {
    pub fn kind(&self) -> TurnStrategyKind {
        match self {
            TurnStrategyConfig::RoundRobin(_) => TurnStrategyKind::RoundRobin,
            TurnStrategyConfig::Moderated(_) => TurnStrategyKind::Moderated,
            TurnStrategyConfig::FreeForm(_) => TurnStrategyKind::FreeForm,
            TurnStrategyConfig::ContextAware(_) => TurnStrategyKind::ContextAware,
            TurnStrategyConfig::PriorityBased(_) => TurnStrategyKind::PriorityBased,
            TurnStrategyConfig::ExpertiseDriven(_) => TurnStrategyKind::ExpertiseDriven,
        }
    }

    /// Only the turn holder may submit messages.
    pub fn enforces_exclusive_turns(&self) -> bool {
        !matches!(self, TurnStrategyConfig::FreeForm(_))
    }

    /// A single message completes the holder's turn.
    ///
    /// Moderated discussions keep the floor with the speaker until the
    /// moderator moves it, unless the strategy auto-advances.
    pub fn ends_turn_on_message(&self) -> bool {
        match self {
            TurnStrategyConfig::Moderated(c) => c.auto_advance,
            TurnStrategyConfig::FreeForm(_) => false,
            _ => true,
        }
    }

    /// Clamp numeric parameters into their documented ranges.
    pub fn normalized(self) -> Self {
        match self {
            TurnStrategyConfig::ContextAware(c) => {
                TurnStrategyConfig::ContextAware(ContextAwareConfig {
                    relevance_weight: clamp_unit(c.relevance_weight),
                    expertise_weight: clamp_unit(c.expertise_weight),
                    engagement_weight: clamp_unit(c.engagement_weight),
                    relevance_threshold: clamp_unit(c.relevance_threshold),
                })
            }
            TurnStrategyConfig::PriorityBased(mut c) => {
                for entry in &mut c.priorities {
                    entry.priority = entry.priority.min(PriorityBasedConfig::MAX_PRIORITY);
                }
                TurnStrategyConfig::PriorityBased(c)
            }
            TurnStrategyConfig::ExpertiseDriven(mut c) => {
                c.expertise_threshold = clamp_unit(c.expertise_threshold);
                TurnStrategyConfig::ExpertiseDriven(c)
            }
            other => other,
        }
    }

    /// Check the configuration against the current roster.
    pub fn validate(&self, registry: &ParticipantRegistry) -> Result<(), String> {
        if let TurnStrategyConfig::Moderated(c) = self {
            match registry.get(&c.moderator_id) {
                None => {
                    return Err(format!(
                        "moderator {} is not a participant of this discussion",
                        c.moderator_id
                    ));
                }
                Some(p) if !p.permissions.allows(ParticipantAction::Moderate) => {
                    return Err(format!(
                        "moderator {} lacks the moderate permission",
                        c.moderator_id
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
