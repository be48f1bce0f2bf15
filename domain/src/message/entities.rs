//! Discussion message entities

use crate::core::id::{DiscussionId, MessageId, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of contribution a message makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Message,
    Question,
    Answer,
    Clarification,
    Objection,
    Agreement,
    Summary,
    Decision,
    ActionItem,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Message => "message",
            MessageType::Question => "question",
            MessageType::Answer => "answer",
            MessageType::Clarification => "clarification",
            MessageType::Objection => "objection",
            MessageType::Agreement => "agreement",
            MessageType::Summary => "summary",
            MessageType::Decision => "decision",
            MessageType::ActionItem => "action_item",
            MessageType::System => "system",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "message" => Ok(MessageType::Message),
            "question" => Ok(MessageType::Question),
            "answer" => Ok(MessageType::Answer),
            "clarification" => Ok(MessageType::Clarification),
            "objection" => Ok(MessageType::Objection),
            "agreement" => Ok(MessageType::Agreement),
            "summary" => Ok(MessageType::Summary),
            "decision" => Ok(MessageType::Decision),
            "action_item" => Ok(MessageType::ActionItem),
            "system" => Ok(MessageType::System),
            _ => Err(format!("Unknown message type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub participant_id: ParticipantId,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Previous content kept when a message is edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub previous_content: String,
    pub edited_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// A message in a discussion (Entity)
///
/// Messages are never removed. Deletion sets a tombstone and edits push the
/// old content onto `edit_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionMessage {
    pub id: MessageId,
    pub discussion_id: DiscussionId,
    pub participant_id: ParticipantId,
    /// Position in the discussion's message log, starting at 1
    pub sequence: u64,
    /// Turn during which the message was sent (0 before any turn was handed out)
    pub turn_number: u64,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to: Option<MessageId>,
    pub thread_id: Option<MessageId>,
    #[serde(default)]
    pub mentions: Vec<ParticipantId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub edit_history: Vec<EditRecord>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Content and metadata of a message being submitted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageDraft {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub reply_to: Option<MessageId>,
    #[serde(default)]
    pub thread_id: Option<MessageId>,
    #[serde(default)]
    pub mentions: Vec<ParticipantId>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MessageDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn replying_to(mut self, message_id: impl Into<MessageId>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    pub fn in_thread(mut self, thread_id: impl Into<MessageId>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn mentioning(mut self, participant: impl Into<ParticipantId>) -> Self {
        self.mentions.push(participant.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_round_trip_names() {
        assert_eq!(MessageType::ActionItem.as_str(), "action_item");
        assert_eq!(
            "action-item".parse::<MessageType>().ok(),
            Some(MessageType::ActionItem)
        );
        assert!("shout".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_draft_builder() {
        let draft = MessageDraft::new("Why not ship Friday?")
            .with_type(MessageType::Question)
            .replying_to("m-1")
            .mentioning("b")
            .with_tag("release");
        assert_eq!(draft.message_type, MessageType::Question);
        assert_eq!(draft.reply_to, Some(MessageId::new("m-1")));
        assert_eq!(draft.mentions, vec![ParticipantId::new("b")]);
        assert_eq!(draft.tags, vec!["release".to_string()]);
    }
}
