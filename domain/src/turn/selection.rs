//! Next-speaker selection
//!
//! [`select_next`] is the single place where the strategy configuration is
//! matched. It is a pure function: it reads the roster, scores and strategy
//! memory and returns the outcome together with the updated memory and any
//! participants the strategy decided to deactivate. The caller commits both.

use super::config::{
    ContextAwareConfig, ExpertiseDrivenConfig, FreeFormConfig, ModeratedConfig,
    PriorityBasedConfig, RoundRobinConfig, TurnStrategyConfig,
};
use super::scoring::{ScoringInputs, keyword_match};
use super::state::StrategyState;
use crate::core::id::ParticipantId;
use crate::participant::entities::DiscussionParticipant;
use crate::participant::registry::ParticipantRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Why the previous turn ended (or why a turn is being handed out)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEndReason {
    /// The discussion just started
    Start,
    /// The holder's message completed the turn
    MessageCompleted,
    /// The turn timer expired
    Timeout,
    /// The holder stayed silent past the response window
    ResponseTimeout,
    /// The holder passed explicitly
    Pass,
    /// The holder left the discussion
    ParticipantLeft,
    /// A moderator handed the floor to someone
    ModeratorPick,
    /// A queued speak request was granted
    SpeakRequest,
    /// A participant took the floor by speaking
    Claimed,
    /// The discussion resumed with nobody holding the floor
    Resumed,
}

impl TurnEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnEndReason::Start => "start",
            TurnEndReason::MessageCompleted => "message_completed",
            TurnEndReason::Timeout => "timeout",
            TurnEndReason::ResponseTimeout => "response_timeout",
            TurnEndReason::Pass => "pass",
            TurnEndReason::ParticipantLeft => "participant_left",
            TurnEndReason::ModeratorPick => "moderator_pick",
            TurnEndReason::SpeakRequest => "speak_request",
            TurnEndReason::Claimed => "claimed",
            TurnEndReason::Resumed => "resumed",
        }
    }

    /// The holder let the turn go by without being pushed out.
    pub fn is_silent_end(&self) -> bool {
        matches!(
            self,
            TurnEndReason::Timeout | TurnEndReason::ResponseTimeout | TurnEndReason::Pass
        )
    }
}

impl std::fmt::Display for TurnEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the selector knows about the turn that just ended
#[derive(Debug, Clone, PartialEq)]
pub struct TurnContext {
    pub previous: Option<ParticipantId>,
    /// The previous holder sent at least one message during their turn
    pub contributed: bool,
    pub reason: TurnEndReason,
    pub now: DateTime<Utc>,
}

impl TurnContext {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            previous: None,
            contributed: false,
            reason: TurnEndReason::Start,
            now,
        }
    }
}

/// Outcome of a selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "participant_id", rename_all = "snake_case")]
pub enum TurnSelection {
    /// This participant holds the next turn
    Speaker(ParticipantId),
    /// Eligible participants exist but the policy waits for a pick or request
    Awaiting,
    /// Nobody is eligible any more
    Exhausted,
}

impl TurnSelection {
    pub fn speaker(&self) -> Option<&ParticipantId> {
        match self {
            TurnSelection::Speaker(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub outcome: TurnSelection,
    pub state: StrategyState,
    /// Participants the strategy marked inactive while selecting
    pub deactivated: Vec<ParticipantId>,
    /// The strategy could not decide and fell back to rotation for this turn
    pub fallback: bool,
}

/// Pick the next turn holder under `config`.
pub fn select_next(
    config: &TurnStrategyConfig,
    state: &StrategyState,
    registry: &ParticipantRegistry,
    ctx: &TurnContext,
    scores: &ScoringInputs,
) -> Selection {
    let mut selector = Selector {
        registry,
        ctx,
        state: state.clone(),
        deactivated: Vec::new(),
        fallback: false,
    };

    if ctx.contributed
        && let Some(prev) = &ctx.previous
    {
        selector.state.record_contribution(prev);
    }

    let outcome = match config {
        TurnStrategyConfig::RoundRobin(c) => selector.round_robin(c),
        TurnStrategyConfig::Moderated(c) => selector.moderated(c),
        TurnStrategyConfig::FreeForm(c) => selector.free_form(c),
        TurnStrategyConfig::ContextAware(c) => selector.context_aware(c, scores),
        TurnStrategyConfig::PriorityBased(c) => selector.priority_based(c),
        TurnStrategyConfig::ExpertiseDriven(c) => selector.expertise_driven(c, scores),
    };

    Selection {
        outcome,
        state: selector.state,
        deactivated: selector.deactivated,
        fallback: selector.fallback,
    }
}

struct Selector<'a> {
    registry: &'a ParticipantRegistry,
    ctx: &'a TurnContext,
    state: StrategyState,
    deactivated: Vec<ParticipantId>,
    fallback: bool,
}

impl<'a> Selector<'a> {
    fn is_eligible(&self, p: &DiscussionParticipant) -> bool {
        p.can_take_turn() && !self.deactivated.contains(&p.id)
    }

    fn eligible(&self) -> Vec<&'a DiscussionParticipant> {
        self.registry
            .eligible()
            .into_iter()
            .filter(|p| !self.deactivated.contains(&p.id))
            .collect()
    }

    /// Eligible participants, minus the previous holder unless they are the only one.
    fn candidates(&self) -> Vec<&'a DiscussionParticipant> {
        let eligible = self.eligible();
        match &self.ctx.previous {
            Some(prev) if eligible.len() > 1 => {
                eligible.into_iter().filter(|p| &p.id != prev).collect()
            }
            _ => eligible,
        }
    }

    /// Next eligible participant in join order after the previous holder.
    ///
    /// Departed participants keep their slot, so the cycle does not shift
    /// when someone leaves and comes back.
    fn rotation(&self) -> TurnSelection {
        let order = self.registry.join_order();
        if order.is_empty() {
            return TurnSelection::Exhausted;
        }
        let start = self
            .ctx
            .previous
            .as_ref()
            .and_then(|prev| order.iter().position(|p| &p.id == prev))
            .map_or(0, |i| i + 1);
        (0..order.len())
            .map(|offset| order[(start + offset) % order.len()])
            .find(|p| self.is_eligible(p))
            .map_or(TurnSelection::Exhausted, |p| {
                TurnSelection::Speaker(p.id.clone())
            })
    }

    fn awaiting_or_exhausted(&self) -> TurnSelection {
        if self.eligible().is_empty() {
            TurnSelection::Exhausted
        } else {
            TurnSelection::Awaiting
        }
    }

    fn round_robin(&mut self, config: &RoundRobinConfig) -> TurnSelection {
        if let Some(prev) = &self.ctx.previous
            && self.ctx.reason.is_silent_end()
            && !self.ctx.contributed
        {
            let streak = self.state.round_robin.record_skip(prev);
            let still_active = self.registry.get(prev).is_some_and(|p| p.is_active);
            if config.skip_inactive && config.max_skips > 0 && streak >= config.max_skips && still_active
            {
                self.state.round_robin.reset(prev);
                self.deactivated.push(prev.clone());
            }
        }
        self.rotation()
    }

    fn moderated(&mut self, config: &ModeratedConfig) -> TurnSelection {
        if let Some(pick) = self.state.moderated.confirmed_pick.take() {
            let eligible = self.registry.get(&pick).is_some_and(|p| self.is_eligible(p));
            if eligible {
                return TurnSelection::Speaker(pick);
            }
        }
        if config.auto_advance {
            self.rotation()
        } else {
            self.awaiting_or_exhausted()
        }
    }

    fn free_form(&mut self, config: &FreeFormConfig) -> TurnSelection {
        let now = self.ctx.now;
        if let Some(prev) = &self.ctx.previous {
            self.state.free_form.last_turn_at.insert(prev.clone(), now);
        }

        let registry = self.registry;
        self.state
            .free_form
            .speak_queue
            .retain(|id| registry.get(id).is_some_and(|p| p.can_take_turn()));

        let cooldown = chrono::Duration::seconds(config.cooldown_period_secs as i64);
        let ready = self
            .state
            .free_form
            .speak_queue
            .iter()
            .position(|id| !self.state.free_form.in_cooldown(id, now, cooldown));

        match ready.and_then(|i| self.state.free_form.speak_queue.remove(i)) {
            Some(id) => TurnSelection::Speaker(id),
            None => self.awaiting_or_exhausted(),
        }
    }

    fn context_aware(&mut self, config: &ContextAwareConfig, scores: &ScoringInputs) -> TurnSelection {
        let candidates = self.candidates();
        let preferred: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|p| scores.get_or_zero(&p.id).relevance >= config.relevance_threshold)
            .collect();
        let pool = if preferred.is_empty() { candidates } else { preferred };

        let weighted = |p: &DiscussionParticipant| {
            let s = scores.get_or_zero(&p.id);
            s.relevance * config.relevance_weight
                + s.expertise * config.expertise_weight
                + s.engagement * config.engagement_weight
        };

        let mut best: Option<(&DiscussionParticipant, f64)> = None;
        for p in pool {
            let score = weighted(p);
            let better = match best {
                None => true,
                Some((current, current_score)) => match score.total_cmp(&current_score) {
                    Ordering::Greater => true,
                    Ordering::Equal => p.last_active_at < current.last_active_at,
                    Ordering::Less => false,
                },
            };
            if better {
                best = Some((p, score));
            }
        }
        best.map_or(TurnSelection::Exhausted, |(p, _)| {
            TurnSelection::Speaker(p.id.clone())
        })
    }

    fn priority_based(&mut self, config: &PriorityBasedConfig) -> TurnSelection {
        let mut best: Option<(&DiscussionParticipant, u8)> = None;
        for p in self.candidates() {
            let priority = config.priority_of(&p.id);
            if best.is_none_or(|(_, top)| priority > top) {
                best = Some((p, priority));
            }
        }
        best.map_or(TurnSelection::Exhausted, |(p, _)| {
            TurnSelection::Speaker(p.id.clone())
        })
    }

    fn expertise_driven(
        &mut self,
        config: &ExpertiseDrivenConfig,
        scores: &ScoringInputs,
    ) -> TurnSelection {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return TurnSelection::Exhausted;
        }

        let mut best: Option<(&DiscussionParticipant, f64)> = None;
        for p in candidates {
            let score = scores
                .get(&p.id)
                .map(|s| s.expertise)
                .unwrap_or_else(|| keyword_match(&p.expertise, &config.topic_keywords));
            if score <= config.expertise_threshold {
                continue;
            }
            if best.is_none_or(|(_, top)| score.total_cmp(&top) == Ordering::Greater) {
                best = Some((p, score));
            }
        }

        match best {
            Some((p, _)) => TurnSelection::Speaker(p.id.clone()),
            None => {
                self.fallback = true;
                self.rotation()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::entities::{NewParticipant, ParticipantRole};
    use crate::turn::config::ModeratedConfig;
    use crate::turn::scoring::ParticipantScores;
    use chrono::Duration;

    fn roster(ids: &[&str]) -> (ParticipantRegistry, DateTime<Utc>) {
        let t0 = Utc::now();
        let mut registry = ParticipantRegistry::new();
        for (i, id) in ids.iter().enumerate() {
            registry
                .join(
                    NewParticipant::new(*id, format!("agent-{id}")),
                    t0 + Duration::seconds(i as i64),
                )
                .unwrap();
        }
        (registry, t0)
    }

    fn ctx(previous: Option<&str>, contributed: bool, reason: TurnEndReason) -> TurnContext {
        TurnContext {
            previous: previous.map(ParticipantId::new),
            contributed,
            reason,
            now: Utc::now() + Duration::minutes(10),
        }
    }

    fn speaker(selection: &Selection) -> &str {
        selection
            .outcome
            .speaker()
            .map(|id| id.as_str())
            .unwrap_or("<none>")
    }

    #[test]
    fn test_round_robin_cycles_in_join_order() {
        let (registry, t0) = roster(&["a", "b", "c"]);
        let config = TurnStrategyConfig::default();
        let scores = ScoringInputs::new();
        let mut state = StrategyState::default();

        let first = select_next(&config, &state, &registry, &TurnContext::start(t0), &scores);
        assert_eq!(speaker(&first), "a");

        let mut previous = "a".to_string();
        let mut seen = Vec::new();
        for _ in 0..6 {
            let selection = select_next(
                &config,
                &state,
                &registry,
                &ctx(Some(&previous), true, TurnEndReason::MessageCompleted),
                &scores,
            );
            previous = speaker(&selection).to_string();
            seen.push(previous.clone());
            state = selection.state;
        }
        assert_eq!(seen, vec!["b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_round_robin_deactivates_after_max_skips() {
        let (registry, _) = roster(&["a", "b", "c"]);
        let config = TurnStrategyConfig::RoundRobin(RoundRobinConfig {
            skip_inactive: true,
            max_skips: 2,
        });
        let scores = ScoringInputs::new();
        let silent = ctx(Some("b"), false, TurnEndReason::Timeout);

        let first = select_next(&config, &StrategyState::default(), &registry, &silent, &scores);
        assert!(first.deactivated.is_empty());
        assert_eq!(first.state.round_robin.skips(&ParticipantId::new("b")), 1);

        let second = select_next(&config, &first.state, &registry, &silent, &scores);
        assert_eq!(second.deactivated, vec![ParticipantId::new("b")]);
        assert_eq!(speaker(&second), "c");
    }

    #[test]
    fn test_round_robin_skip_disabled() {
        let (registry, _) = roster(&["a", "b"]);
        let config = TurnStrategyConfig::RoundRobin(RoundRobinConfig {
            skip_inactive: false,
            max_skips: 1,
        });
        let selection = select_next(
            &config,
            &StrategyState::default(),
            &registry,
            &ctx(Some("b"), false, TurnEndReason::Pass),
            &ScoringInputs::new(),
        );
        assert!(selection.deactivated.is_empty());
    }

    #[test]
    fn test_round_robin_skips_departed_participants() {
        let (mut registry, _) = roster(&["a", "b", "c"]);
        registry.leave(&ParticipantId::new("b")).unwrap();
        let selection = select_next(
            &TurnStrategyConfig::default(),
            &StrategyState::default(),
            &registry,
            &ctx(Some("a"), true, TurnEndReason::MessageCompleted),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&selection), "c");
    }

    #[test]
    fn test_exhausted_when_nobody_eligible() {
        let (mut registry, t0) = roster(&["a", "b"]);
        registry.leave(&ParticipantId::new("a")).unwrap();
        registry.leave(&ParticipantId::new("b")).unwrap();
        for config in [
            TurnStrategyConfig::default(),
            TurnStrategyConfig::FreeForm(FreeFormConfig::default()),
            TurnStrategyConfig::ContextAware(ContextAwareConfig::default()),
            TurnStrategyConfig::PriorityBased(PriorityBasedConfig::default()),
            TurnStrategyConfig::ExpertiseDriven(ExpertiseDrivenConfig::default()),
        ] {
            let selection = select_next(
                &config,
                &StrategyState::default(),
                &registry,
                &TurnContext::start(t0),
                &ScoringInputs::new(),
            );
            assert_eq!(selection.outcome, TurnSelection::Exhausted, "{config:?}");
        }
    }

    #[test]
    fn test_observers_are_never_selected() {
        let t0 = Utc::now();
        let mut registry = ParticipantRegistry::new();
        registry
            .join(
                NewParticipant::new("obs", "agent-obs").with_role(ParticipantRole::Observer),
                t0,
            )
            .unwrap();
        registry
            .join(NewParticipant::new("a", "agent-a"), t0 + Duration::seconds(1))
            .unwrap();
        let config = TurnStrategyConfig::PriorityBased(PriorityBasedConfig::from_pairs([
            ("obs", 10),
            ("a", 1),
        ]));
        let selection = select_next(
            &config,
            &StrategyState::default(),
            &registry,
            &TurnContext::start(t0),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&selection), "a");
    }

    #[test]
    fn test_priority_ties_break_by_join_order() {
        let (registry, t0) = roster(&["a", "b", "c"]);
        let config = TurnStrategyConfig::PriorityBased(PriorityBasedConfig::from_pairs([
            ("a", 5),
            ("b", 8),
            ("c", 8),
        ]));
        let selection = select_next(
            &config,
            &StrategyState::default(),
            &registry,
            &TurnContext::start(t0),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&selection), "b");

        // b just spoke, so the floor moves to c
        let next = select_next(
            &config,
            &selection.state,
            &registry,
            &ctx(Some("b"), true, TurnEndReason::MessageCompleted),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&next), "c");
    }

    #[test]
    fn test_context_aware_prefers_relevant_candidates() {
        let (registry, t0) = roster(&["a", "b", "c"]);
        let config = TurnStrategyConfig::ContextAware(ContextAwareConfig::default());
        let scores = ScoringInputs::new()
            .with("a", ParticipantScores::new(0.6, 1.0, 1.0))
            .with("b", ParticipantScores::new(0.75, 0.0, 0.0))
            .with("c", ParticipantScores::new(0.8, 0.1, 0.0));
        let selection = select_next(
            &config,
            &StrategyState::default(),
            &registry,
            &TurnContext::start(t0),
            &scores,
        );
        // a has the highest weighted score but misses the relevance threshold
        assert_eq!(speaker(&selection), "c");
    }

    #[test]
    fn test_context_aware_tie_prefers_least_recently_active() {
        let t0 = Utc::now();
        let mut registry = ParticipantRegistry::new();
        registry.join(NewParticipant::new("a", "agent-a"), t0).unwrap();
        registry
            .join(NewParticipant::new("b", "agent-b"), t0 + Duration::seconds(1))
            .unwrap();
        registry.touch(&ParticipantId::new("a"), t0 + Duration::seconds(30));

        let selection = select_next(
            &TurnStrategyConfig::ContextAware(ContextAwareConfig::default()),
            &StrategyState::default(),
            &registry,
            &TurnContext::start(t0),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&selection), "b");
    }

    #[test]
    fn test_expertise_falls_back_to_rotation_for_one_turn() {
        let (registry, t0) = roster(&["a", "b", "c"]);
        let config = TurnStrategyConfig::ExpertiseDriven(ExpertiseDrivenConfig {
            topic_keywords: vec!["rust".into()],
            expertise_threshold: 0.8,
        });
        let low = ScoringInputs::new()
            .with("a", ParticipantScores::new(0.0, 0.5, 0.0))
            .with("b", ParticipantScores::new(0.0, 0.8, 0.0))
            .with("c", ParticipantScores::new(0.0, 0.7, 0.0));
        let selection = select_next(
            &config,
            &StrategyState::default(),
            &registry,
            &ctx(Some("a"), true, TurnEndReason::MessageCompleted),
            &low,
        );
        assert!(selection.fallback);
        assert_eq!(speaker(&selection), "b");

        let high = low.clone().with("c", ParticipantScores::new(0.0, 0.95, 0.0));
        let selection = select_next(
            &config,
            &selection.state,
            &registry,
            &TurnContext::start(t0),
            &high,
        );
        assert!(!selection.fallback);
        assert_eq!(speaker(&selection), "c");
    }

    #[test]
    fn test_expertise_uses_keyword_tags_without_scores() {
        let t0 = Utc::now();
        let mut registry = ParticipantRegistry::new();
        registry.join(NewParticipant::new("a", "agent-a"), t0).unwrap();
        registry
            .join(
                NewParticipant::new("b", "agent-b").with_expertise(["rust", "tokio"]),
                t0 + Duration::seconds(1),
            )
            .unwrap();
        let config = TurnStrategyConfig::ExpertiseDriven(ExpertiseDrivenConfig {
            topic_keywords: vec!["rust".into(), "tokio".into()],
            expertise_threshold: 0.8,
        });
        let selection = select_next(
            &config,
            &StrategyState::default(),
            &registry,
            &TurnContext::start(t0),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&selection), "b");
        assert!(!selection.fallback);
    }

    #[test]
    fn test_moderated_waits_for_pick() {
        let (registry, t0) = roster(&["m", "a", "b"]);
        let config = TurnStrategyConfig::Moderated(ModeratedConfig::new("m"));
        let waiting = select_next(
            &config,
            &StrategyState::default(),
            &registry,
            &TurnContext::start(t0),
            &ScoringInputs::new(),
        );
        assert_eq!(waiting.outcome, TurnSelection::Awaiting);

        let mut state = StrategyState::default();
        state.moderated.confirmed_pick = Some(ParticipantId::new("b"));
        let picked = select_next(
            &config,
            &state,
            &registry,
            &TurnContext::start(t0),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&picked), "b");
        assert!(picked.state.moderated.confirmed_pick.is_none());
    }

    #[test]
    fn test_moderated_auto_advance_rotates() {
        let (registry, _) = roster(&["m", "a", "b"]);
        let mut moderated = ModeratedConfig::new("m");
        moderated.auto_advance = true;
        let selection = select_next(
            &TurnStrategyConfig::Moderated(moderated),
            &StrategyState::default(),
            &registry,
            &ctx(Some("a"), true, TurnEndReason::MessageCompleted),
            &ScoringInputs::new(),
        );
        assert_eq!(speaker(&selection), "b");
    }

    #[test]
    fn test_free_form_fifo_with_cooldown() {
        let (registry, _) = roster(&["a", "b", "c"]);
        let config = TurnStrategyConfig::FreeForm(FreeFormConfig {
            cooldown_period_secs: 5,
        });
        let turn_end = ctx(Some("a"), true, TurnEndReason::MessageCompleted);

        let mut state = StrategyState::default();
        state.free_form.enqueue(&ParticipantId::new("a"));
        state.free_form.enqueue(&ParticipantId::new("c"));
        state.free_form.enqueue(&ParticipantId::new("b"));

        // a just finished and is cooling down; c asked first among the rest
        let selection = select_next(&config, &state, &registry, &turn_end, &ScoringInputs::new());
        assert_eq!(speaker(&selection), "c");
        let queue: Vec<_> = selection
            .state
            .free_form
            .speak_queue
            .iter()
            .map(|id| id.as_str())
            .collect();
        assert_eq!(queue, vec!["a", "b"]);
        assert_eq!(
            selection.state.free_form.last_turn_at.get(&ParticipantId::new("a")),
            Some(&turn_end.now)
        );
    }

    #[test]
    fn test_free_form_empty_queue_awaits() {
        let (registry, t0) = roster(&["a", "b"]);
        let selection = select_next(
            &TurnStrategyConfig::FreeForm(FreeFormConfig::default()),
            &StrategyState::default(),
            &registry,
            &TurnContext::start(t0),
            &ScoringInputs::new(),
        );
        assert_eq!(selection.outcome, TurnSelection::Awaiting);
    }
}
