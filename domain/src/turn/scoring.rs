//! Externally supplied participant scores
//!
//! Scores come from a pluggable scorer; the strategies only read them.
//! Values are clamped to `[0, 1]` on insert and a missing entry counts as 0.

use crate::core::id::ParticipantId;
use crate::discussion::state::clamp_unit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantScores {
    pub relevance: f64,
    pub expertise: f64,
    pub engagement: f64,
}

impl ParticipantScores {
    pub fn new(relevance: f64, expertise: f64, engagement: f64) -> Self {
        Self {
            relevance,
            expertise,
            engagement,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            relevance: clamp_unit(self.relevance),
            expertise: clamp_unit(self.expertise),
            engagement: clamp_unit(self.engagement),
        }
    }
}

/// Latest scores per participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoringInputs {
    scores: BTreeMap<ParticipantId, ParticipantScores>,
}

impl ScoringInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<ParticipantId>, scores: ParticipantScores) -> Self {
        self.set(id.into(), scores);
        self
    }

    pub fn set(&mut self, id: ParticipantId, scores: ParticipantScores) {
        self.scores.insert(id, scores.clamped());
    }

    /// Overwrite entries present in `other`, keep the rest.
    pub fn merge(&mut self, other: ScoringInputs) {
        for (id, scores) in other.scores {
            self.set(id, scores);
        }
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&ParticipantScores> {
        self.scores.get(id)
    }

    /// Scores for `id`, zeros when unknown.
    pub fn get_or_zero(&self, id: &ParticipantId) -> ParticipantScores {
        self.scores.get(id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &ParticipantScores)> {
        self.scores.iter()
    }
}

/// Fraction of `keywords` matched (case-insensitively) by any expertise tag.
///
/// A tag matches a keyword when either contains the other, so `"rust"`
/// matches `"rust async"`. Returns 0 when there are no keywords.
pub fn keyword_match(expertise: &[String], keywords: &[String]) -> f64 {
    if keywords.is_empty() || expertise.is_empty() {
        return 0.0;
    }
    let tags: Vec<String> = expertise.iter().map(|t| t.trim().to_lowercase()).collect();
    let matched = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .filter(|k| {
            tags.iter()
                .any(|t| !t.is_empty() && (t.contains(k.as_str()) || k.contains(t.as_str())))
        })
        .count();
    matched as f64 / keywords.len() as f64
}
