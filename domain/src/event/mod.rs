//! Discussion events
//!
//! Every committed operation produces zero or more [`DiscussionEvent`]s. Each
//! carries a per-discussion `sequence` that increases by one per event, so a
//! subscriber can detect gaps and reorderings.
//!
//! Serialized flat, with the payload's fields next to the envelope:
//!
//! ```json
//! {"id": "…", "discussion_id": "d-1", "sequence": 7, "participant_id": "a",
//!  "timestamp": "2026-01-01T00:00:00Z", "type": "reaction_added",
//!  "message_id": "m-3", "emoji": "👍"}
//! ```

use crate::core::id::{DiscussionId, EventId, MessageId, ParticipantId};
use crate::discussion::entities::{DiscussionPhase, DiscussionStatus};
use crate::discussion::settings::DiscussionSettings;
use crate::message::entities::MessageType;
use crate::participant::entities::ParticipantRole;
use crate::turn::selection::TurnEndReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionEventType {
    ParticipantJoined,
    ParticipantLeft,
    MessageSent,
    MessageEdited,
    MessageDeleted,
    TurnChanged,
    StatusChanged,
    SettingsUpdated,
    ReactionAdded,
    TypingStarted,
    TypingStopped,
}

impl DiscussionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionEventType::ParticipantJoined => "participant_joined",
            DiscussionEventType::ParticipantLeft => "participant_left",
            DiscussionEventType::MessageSent => "message_sent",
            DiscussionEventType::MessageEdited => "message_edited",
            DiscussionEventType::MessageDeleted => "message_deleted",
            DiscussionEventType::TurnChanged => "turn_changed",
            DiscussionEventType::StatusChanged => "status_changed",
            DiscussionEventType::SettingsUpdated => "settings_updated",
            DiscussionEventType::ReactionAdded => "reaction_added",
            DiscussionEventType::TypingStarted => "typing_started",
            DiscussionEventType::TypingStopped => "typing_stopped",
        }
    }
}

impl std::fmt::Display for DiscussionEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a participant left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    /// The participant left on their own
    Left,
    /// Round Robin deactivated them for staying silent too often
    MaxSkips,
}

impl LeaveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveReason::Left => "left",
            LeaveReason::MaxSkips => "max_skips",
        }
    }
}

/// Event-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    ParticipantJoined {
        role: ParticipantRole,
        rejoined: bool,
    },
    ParticipantLeft {
        reason: LeaveReason,
    },
    MessageSent {
        message_id: MessageId,
        message_type: MessageType,
        turn_number: u64,
        reply_to: Option<MessageId>,
        content: String,
    },
    MessageEdited {
        message_id: MessageId,
        reason: Option<String>,
    },
    MessageDeleted {
        message_id: MessageId,
    },
    TurnChanged {
        previous: Option<ParticipantId>,
        current: Option<ParticipantId>,
        turn_number: u64,
        reason: TurnEndReason,
        phase: DiscussionPhase,
        expected_end_at: Option<DateTime<Utc>>,
        /// Selection fell back to rotation for this turn
        #[serde(default)]
        fallback: bool,
    },
    StatusChanged {
        from: DiscussionStatus,
        to: DiscussionStatus,
        phase: DiscussionPhase,
        reason: Option<String>,
    },
    SettingsUpdated {
        settings: DiscussionSettings,
    },
    ReactionAdded {
        message_id: MessageId,
        emoji: String,
    },
    TypingStarted,
    TypingStopped,
}

impl EventPayload {
    pub fn event_type(&self) -> DiscussionEventType {
        match self {
            EventPayload::ParticipantJoined { .. } => DiscussionEventType::ParticipantJoined,
            EventPayload::ParticipantLeft { .. } => DiscussionEventType::ParticipantLeft,
            EventPayload::MessageSent { .. } => DiscussionEventType::MessageSent,
            EventPayload::MessageEdited { .. } => DiscussionEventType::MessageEdited,
            EventPayload::MessageDeleted { .. } => DiscussionEventType::MessageDeleted,
            EventPayload::TurnChanged { .. } => DiscussionEventType::TurnChanged,
            EventPayload::StatusChanged { .. } => DiscussionEventType::StatusChanged,
            EventPayload::SettingsUpdated { .. } => DiscussionEventType::SettingsUpdated,
            EventPayload::ReactionAdded { .. } => DiscussionEventType::ReactionAdded,
            EventPayload::TypingStarted => DiscussionEventType::TypingStarted,
            EventPayload::TypingStopped => DiscussionEventType::TypingStopped,
        }
    }
}

/// An event emitted by one discussion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionEvent {
    pub id: EventId,
    pub discussion_id: DiscussionId,
    /// Per-discussion emission order, starting at 1
    pub sequence: u64,
    /// Participant the event concerns, if any
    pub participant_id: Option<ParticipantId>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl DiscussionEvent {
    pub fn event_type(&self) -> DiscussionEventType {
        self.payload.event_type()
    }
}
