//! Mutable discussion state owned by the orchestrator
//!
//! [`DiscussionState`] is embedded in the [`Discussion`](super::entities::Discussion)
//! aggregate but is only ever advanced through orchestrator operations.

use super::entities::DiscussionPhase;
use crate::core::id::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The turn currently in progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentTurn {
    /// Holder of the turn; `None` while waiting for a pick or speak request
    pub participant_id: Option<ParticipantId>,
    pub started_at: Option<DateTime<Utc>>,
    pub expected_end_at: Option<DateTime<Utc>>,
    /// Number of turns handed out so far (1 for the first speaker)
    pub turn_number: u64,
    /// Messages the holder has sent during this turn
    #[serde(default)]
    pub messages_in_turn: u32,
}

/// A point the discussion has surfaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub point: String,
    pub supporting_participants: Vec<ParticipantId>,
    pub confidence: f64,
}

/// A decision the discussion has reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: String,
    pub decided_at: DateTime<Utc>,
    pub participants: Vec<ParticipantId>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionItemStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ActionItemStatus {
    /// Open items are rolled back when a discussion is cancelled with compensation.
    pub fn is_open(&self) -> bool {
        matches!(self, ActionItemStatus::Pending | ActionItemStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub item: String,
    pub assigned_to: Option<ParticipantId>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ActionItemStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionState {
    pub current_turn: CurrentTurn,
    pub phase: DiscussionPhase,
    pub message_count: u64,
    pub active_participants: usize,
    pub last_activity: Option<DateTime<Utc>>,
    /// Agreement level in [0, 1]
    pub consensus_level: f64,
    /// Engagement in [0, 100]
    pub engagement_score: f64,
    /// Drift away from the topic in [0, 1]
    pub topic_drift: f64,
    pub key_points: Vec<KeyPoint>,
    pub decisions: Vec<Decision>,
    pub action_items: Vec<ActionItem>,
}

impl Default for DiscussionState {
    fn default() -> Self {
        Self {
            current_turn: CurrentTurn::default(),
            phase: DiscussionPhase::Initialization,
            message_count: 0,
            active_participants: 0,
            last_activity: None,
            consensus_level: 0.0,
            engagement_score: 0.0,
            topic_drift: 0.0,
            key_points: Vec::new(),
            decisions: Vec::new(),
            action_items: Vec::new(),
        }
    }
}

/// Analysis produced by an external scorer, merged into [`DiscussionState`].
///
/// Derived scores replace the current values (clamped to their ranges);
/// key points, decisions and action items are appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionAnalysis {
    pub consensus_level: Option<f64>,
    pub engagement_score: Option<f64>,
    pub topic_drift: Option<f64>,
    pub key_points: Vec<KeyPoint>,
    pub decisions: Vec<Decision>,
    pub action_items: Vec<ActionItem>,
}

impl DiscussionAnalysis {
    pub fn is_empty(&self) -> bool {
        self.consensus_level.is_none()
            && self.engagement_score.is_none()
            && self.topic_drift.is_none()
            && self.key_points.is_empty()
            && self.decisions.is_empty()
            && self.action_items.is_empty()
    }
}

impl DiscussionState {
    pub(crate) fn apply_analysis(&mut self, analysis: DiscussionAnalysis) {
        if let Some(v) = analysis.consensus_level {
            self.consensus_level = clamp_unit(v);
        }
        if let Some(v) = analysis.engagement_score {
            self.engagement_score = if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
        }
        if let Some(v) = analysis.topic_drift {
            self.topic_drift = clamp_unit(v);
        }
        self.key_points
            .extend(analysis.key_points.into_iter().map(|mut kp| {
                kp.confidence = clamp_unit(kp.confidence);
                kp
            }));
        self.decisions
            .extend(analysis.decisions.into_iter().map(|mut d| {
                d.confidence = clamp_unit(d.confidence);
                d
            }));
        self.action_items.extend(analysis.action_items);
    }

    /// Cancel every open action item. Returns how many were cancelled.
    pub(crate) fn cancel_open_action_items(&mut self) -> usize {
        let mut cancelled = 0;
        for item in self.action_items.iter_mut().filter(|i| i.status.is_open()) {
            item.status = ActionItemStatus::Cancelled;
            cancelled += 1;
        }
        cancelled
    }
}

/// Clamp to [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
