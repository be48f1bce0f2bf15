//! Keyword-based participant scorer.
//!
//! A deterministic, offline [`ScoringProvider`]:
//!
//! - **expertise**: how many of the discussion's keywords a participant's
//!   expertise tags cover (the strategy's topic keywords when configured,
//!   otherwise terms drawn from the topic and objectives)
//! - **relevance**: how many of the participant's expertise tags come up in
//!   the recent messages
//! - **engagement**: the participant's share of recent messages relative
//!   to an even split, capped at 1
//!
//! It also reports the discussion-level engagement score: the percentage of
//! active participants heard in the recent window.

use async_trait::async_trait;
use colloquy_application::{ScoringError, ScoringProvider, ScoringRequest, ScoringResult};
use colloquy_domain::{
    DiscussionAnalysis, ParticipantScores, ScoringInputs, TurnStrategyConfig, keyword_match,
};
use std::collections::{BTreeSet, HashMap};

const MIN_TERM_LEN: usize = 4;
const STOP_WORDS: [&str; 12] = [
    "about", "after", "should", "their", "there", "these", "this", "what", "when", "which",
    "with", "would",
];

#[derive(Debug, Default)]
pub struct KeywordScorer;

impl KeywordScorer {
    pub fn new() -> Self {
        Self
    }
}

/// Lowercased words of at least four letters, minus common filler.
fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= MIN_TERM_LEN && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

#[async_trait]
impl ScoringProvider for KeywordScorer {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResult, ScoringError> {
        let discussion = &request.discussion;

        let keywords: Vec<String> = match &discussion.turn_strategy {
            TurnStrategyConfig::ExpertiseDriven(c) if !c.topic_keywords.is_empty() => {
                c.topic_keywords.clone()
            }
            _ => {
                let mut text = discussion.topic.clone();
                for objective in &discussion.objectives {
                    text.push(' ');
                    text.push_str(objective);
                }
                terms(&text).into_iter().collect()
            }
        };

        let recent_text = request
            .recent_messages
            .iter()
            .map(|m| m.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut spoken: HashMap<_, usize> = HashMap::new();
        for message in &request.recent_messages {
            *spoken.entry(&message.participant_id).or_default() += 1;
        }

        let active = discussion.participants.list_active();
        let total = request.recent_messages.len();
        let fair_share = if active.is_empty() {
            0.0
        } else {
            total as f64 / active.len() as f64
        };

        let mut scores = ScoringInputs::new();
        for participant in &active {
            let expertise = keyword_match(&participant.expertise, &keywords);

            let tags: Vec<String> = participant
                .expertise
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            let relevance = if tags.is_empty() {
                0.0
            } else {
                let mentioned = tags.iter().filter(|t| recent_text.contains(t.as_str())).count();
                mentioned as f64 / tags.len() as f64
            };

            let count = spoken.get(&participant.id).copied().unwrap_or(0);
            let engagement = if fair_share > 0.0 {
                (count as f64 / fair_share).min(1.0)
            } else {
                0.0
            };

            scores.set(
                participant.id.clone(),
                ParticipantScores::new(relevance, expertise, engagement),
            );
        }

        let heard = active.iter().filter(|p| spoken.contains_key(&p.id)).count();
        let analysis = DiscussionAnalysis {
            engagement_score: (!active.is_empty() && total > 0)
                .then(|| 100.0 * heard as f64 / active.len() as f64),
            ..Default::default()
        };

        Ok(ScoringResult { scores, analysis })
    }
}
