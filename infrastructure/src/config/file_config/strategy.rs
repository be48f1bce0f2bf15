//! Turn strategy configuration from TOML (`[strategy]` section)
//!
//! The section holds tuning for every strategy at once; `kind` picks the
//! one used when the command line does not.
//!
//! ```toml
//! [strategy]
//! kind = "expertise_driven"
//!
//! [strategy.expertise_driven]
//! topic_keywords = ["storage", "latency"]
//! expertise_threshold = 0.6
//!
//! [strategy.priorities]
//! alice = 8
//! bob = 5
//! ```

use super::super::validation::{ConfigIssue, ConfigIssueCode, ConfigValidationError};
use colloquy_domain::{
    ContextAwareConfig, ExpertiseDrivenConfig, FreeFormConfig, ModeratedConfig, ParticipantId,
    PriorityBasedConfig, RoundRobinConfig, TurnStrategyConfig, TurnStrategyKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const KINDS: [&str; 6] = [
    "round_robin",
    "moderated",
    "free_form",
    "context_aware",
    "priority_based",
    "expertise_driven",
];

/// Raw moderated-strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModeratedConfig {
    /// Participant id of the moderator
    pub moderator: Option<String>,
    pub require_approval: bool,
    pub auto_advance: bool,
}

impl Default for FileModeratedConfig {
    fn default() -> Self {
        Self {
            moderator: None,
            require_approval: true,
            auto_advance: false,
        }
    }
}

/// Raw strategy configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStrategyConfig {
    pub kind: String,
    pub round_robin: RoundRobinConfig,
    pub moderated: FileModeratedConfig,
    pub free_form: FreeFormConfig,
    pub context_aware: ContextAwareConfig,
    /// Participant id to priority (0-10) for the priority-based strategy
    pub priorities: BTreeMap<String, u8>,
    pub expertise_driven: ExpertiseDrivenConfig,
}

impl Default for FileStrategyConfig {
    fn default() -> Self {
        Self {
            kind: TurnStrategyKind::RoundRobin.as_str().to_string(),
            round_robin: RoundRobinConfig::default(),
            moderated: FileModeratedConfig::default(),
            free_form: FreeFormConfig::default(),
            context_aware: ContextAwareConfig::default(),
            priorities: BTreeMap::new(),
            expertise_driven: ExpertiseDrivenConfig::default(),
        }
    }
}

impl FileStrategyConfig {
    /// Parse `kind`, falling back to round robin with a warning.
    pub fn parse_kind(&self) -> (TurnStrategyKind, Vec<ConfigIssue>) {
        match self.kind.parse::<TurnStrategyKind>() {
            Ok(kind) => (kind, Vec::new()),
            Err(_) => (
                TurnStrategyKind::RoundRobin,
                vec![ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "strategy.kind".to_string(),
                        value: self.kind.clone(),
                        valid_values: KINDS.iter().map(|k| k.to_string()).collect(),
                    },
                    format!(
                        "strategy.kind: unknown value '{}', falling back to 'round_robin'",
                        self.kind
                    ),
                )],
            ),
        }
    }

    /// Issues with the tuning values themselves.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = self.parse_kind().1;

        let ca = &self.context_aware;
        let weights = [ca.relevance_weight, ca.expertise_weight, ca.engagement_weight];
        if weights.iter().any(|w| *w < 0.0) || weights.iter().all(|w| *w == 0.0) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "strategy.context_aware".to_string(),
                },
                "strategy.context_aware: weights must be non-negative and not all zero",
            ));
        }

        for (participant, priority) in &self.priorities {
            if *priority > PriorityBasedConfig::MAX_PRIORITY {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidValue {
                        field: format!("strategy.priorities.{}", participant),
                    },
                    format!(
                        "strategy.priorities.{}: {} is above {}, clamping",
                        participant,
                        priority,
                        PriorityBasedConfig::MAX_PRIORITY
                    ),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.expertise_driven.expertise_threshold) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "strategy.expertise_driven.expertise_threshold".to_string(),
                },
                "strategy.expertise_driven.expertise_threshold: must be within 0.0-1.0, clamping",
            ));
        }

        issues
    }

    /// Build the strategy for `kind`.
    ///
    /// A moderated strategy uses the configured moderator, or
    /// `fallback_moderator` when none is configured.
    pub fn build(
        &self,
        kind: TurnStrategyKind,
        fallback_moderator: Option<&ParticipantId>,
    ) -> Result<TurnStrategyConfig, ConfigValidationError> {
        let strategy = match kind {
            TurnStrategyKind::RoundRobin => TurnStrategyConfig::RoundRobin(self.round_robin.clone()),
            TurnStrategyKind::Moderated => {
                let moderator = self
                    .moderated
                    .moderator
                    .as_deref()
                    .map(ParticipantId::new)
                    .or_else(|| fallback_moderator.cloned())
                    .ok_or(ConfigValidationError::MissingModerator)?;
                TurnStrategyConfig::Moderated(ModeratedConfig {
                    moderator_id: moderator,
                    require_approval: self.moderated.require_approval,
                    auto_advance: self.moderated.auto_advance,
                })
            }
            TurnStrategyKind::FreeForm => TurnStrategyConfig::FreeForm(self.free_form.clone()),
            TurnStrategyKind::ContextAware => {
                TurnStrategyConfig::ContextAware(self.context_aware.clone())
            }
            TurnStrategyKind::PriorityBased => TurnStrategyConfig::PriorityBased(
                PriorityBasedConfig::from_pairs(
                    self.priorities
                        .iter()
                        .map(|(id, priority)| (id.as_str(), *priority)),
                ),
            ),
            TurnStrategyKind::ExpertiseDriven => {
                TurnStrategyConfig::ExpertiseDriven(self.expertise_driven.clone())
            }
        };
        Ok(strategy.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::FileConfig;

    #[test]
    fn test_strategy_section() {
        let toml_str = r#"
[strategy]
kind = "priority_based"

[strategy.priorities]
alice = 5
bob = 8
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let (kind, issues) = config.strategy.parse_kind();
        assert_eq!(kind, TurnStrategyKind::PriorityBased);
        assert!(issues.is_empty());

        let strategy = config.strategy.build(kind, None).unwrap();
        match strategy {
            TurnStrategyConfig::PriorityBased(c) => {
                assert_eq!(c.priority_of(&ParticipantId::new("bob")), 8);
                assert_eq!(c.priority_of(&ParticipantId::new("carol")), 0);
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let config = FileStrategyConfig {
            kind: "loudest_wins".to_string(),
            ..Default::default()
        };
        let (kind, issues) = config.parse_kind();
        assert_eq!(kind, TurnStrategyKind::RoundRobin);
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_moderated_needs_a_moderator() {
        let config = FileStrategyConfig::default();
        assert!(matches!(
            config.build(TurnStrategyKind::Moderated, None),
            Err(ConfigValidationError::MissingModerator)
        ));

        let fallback = ParticipantId::new("mod");
        match config.build(TurnStrategyKind::Moderated, Some(&fallback)).unwrap() {
            TurnStrategyConfig::Moderated(c) => {
                assert_eq!(c.moderator_id, fallback);
                assert!(c.require_approval);
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_priority_above_max_is_reported() {
        let mut config = FileStrategyConfig::default();
        config.priorities.insert("alice".to_string(), 42);
        assert_eq!(config.issues().len(), 1);
    }
}
