//! Strategy-internal memory
//!
//! Strategies are pure; whatever they need to remember between turns lives
//! here, next to (not inside) the discussion state, and travels with the
//! snapshot.

use crate::core::id::ParticipantId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRobinState {
    /// Consecutive turns each participant let pass without speaking
    pub skip_counts: BTreeMap<ParticipantId, u32>,
}

impl RoundRobinState {
    pub fn skips(&self, id: &ParticipantId) -> u32 {
        self.skip_counts.get(id).copied().unwrap_or(0)
    }

    /// Count one more silent turn and return the new streak.
    pub(crate) fn record_skip(&mut self, id: &ParticipantId) -> u32 {
        let count = self.skip_counts.entry(id.clone()).or_insert(0);
        *count += 1;
        *count
    }

    pub(crate) fn reset(&mut self, id: &ParticipantId) {
        self.skip_counts.remove(id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeratedState {
    /// Pick awaiting confirmation
    pub provisional_pick: Option<ParticipantId>,
    /// Pick the next selection will honor
    pub confirmed_pick: Option<ParticipantId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeFormState {
    /// "Wants to speak" signals in arrival order
    pub speak_queue: VecDeque<ParticipantId>,
    /// When each participant's last turn ended
    pub last_turn_at: BTreeMap<ParticipantId, DateTime<Utc>>,
}

impl FreeFormState {
    /// Queue a speak request. Returns false if the participant is already queued.
    pub(crate) fn enqueue(&mut self, id: &ParticipantId) -> bool {
        if self.speak_queue.contains(id) {
            return false;
        }
        self.speak_queue.push_back(id.clone());
        true
    }

    pub(crate) fn dequeue(&mut self, id: &ParticipantId) {
        self.speak_queue.retain(|queued| queued != id);
    }

    /// Time left before `id` may take another turn, if any.
    pub fn cooldown_remaining(
        &self,
        id: &ParticipantId,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Option<Duration> {
        let ended = self.last_turn_at.get(id)?;
        let ready_at = *ended + cooldown;
        (ready_at > now).then(|| ready_at - now)
    }

    pub fn in_cooldown(&self, id: &ParticipantId, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.cooldown_remaining(id, now, cooldown).is_some()
    }
}

/// Memory of every strategy; only the active strategy's part is consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyState {
    pub round_robin: RoundRobinState,
    pub moderated: ModeratedState,
    pub free_form: FreeFormState,
}

impl StrategyState {
    /// A participant spoke: their silent streak is over.
    pub(crate) fn record_contribution(&mut self, id: &ParticipantId) {
        self.round_robin.reset(id);
    }

    /// Forget a departed participant's pending signals and silent streak.
    pub(crate) fn forget(&mut self, id: &ParticipantId) {
        self.round_robin.reset(id);
        self.free_form.dequeue(id);
        if self.moderated.provisional_pick.as_ref() == Some(id) {
            self.moderated.provisional_pick = None;
        }
        if self.moderated.confirmed_pick.as_ref() == Some(id) {
            self.moderated.confirmed_pick = None;
        }
    }

    /// Drop queued picks and speak requests.
    pub(crate) fn clear_pending(&mut self) {
        self.moderated = ModeratedState::default();
        self.free_form.speak_queue.clear();
    }
}
