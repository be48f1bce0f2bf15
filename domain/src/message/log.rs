//! Append-only message log of one discussion

use super::entities::{DiscussionMessage, EditRecord, MessageDraft, Reaction};
use crate::core::id::{DiscussionId, MessageId, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message-level failures, mapped to orchestrator errors by the state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageLogError {
    #[error("message content must not be empty")]
    EmptyContent,

    #[error("message is {length} characters, the limit is {limit}")]
    TooLong { length: usize, limit: usize },

    #[error("unknown message {0}")]
    UnknownMessage(MessageId),

    #[error("message {0} was deleted")]
    Deleted(MessageId),

    #[error("participant {participant} already reacted with {emoji}")]
    DuplicateReaction {
        participant: ParticipantId,
        emoji: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<DiscussionMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate content against `max_length` characters.
    pub fn check_content(content: &str, max_length: usize) -> Result<(), MessageLogError> {
        if content.trim().is_empty() {
            return Err(MessageLogError::EmptyContent);
        }
        let length = content.chars().count();
        if length > max_length {
            return Err(MessageLogError::TooLong {
                length,
                limit: max_length,
            });
        }
        Ok(())
    }

    /// Append a message. `reply_to` and `thread_id` must name earlier messages.
    pub fn append(
        &mut self,
        discussion_id: &DiscussionId,
        participant_id: &ParticipantId,
        turn_number: u64,
        draft: MessageDraft,
        max_length: usize,
        now: DateTime<Utc>,
    ) -> Result<&DiscussionMessage, MessageLogError> {
        Self::check_content(&draft.content, max_length)?;
        for link in [&draft.reply_to, &draft.thread_id].into_iter().flatten() {
            if self.get(link).is_none() {
                return Err(MessageLogError::UnknownMessage(link.clone()));
            }
        }

        let message = DiscussionMessage {
            id: MessageId::generate(),
            discussion_id: discussion_id.clone(),
            participant_id: participant_id.clone(),
            sequence: self.messages.len() as u64 + 1,
            turn_number,
            content: draft.content,
            message_type: draft.message_type,
            reply_to: draft.reply_to,
            thread_id: draft.thread_id,
            mentions: draft.mentions,
            tags: draft.tags,
            reactions: Vec::new(),
            edit_history: Vec::new(),
            is_edited: false,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
        };
        self.messages.push(message);
        let last = self.messages.len() - 1;
        Ok(&self.messages[last])
    }

    /// Replace the content of a live message, recording the previous version.
    pub fn edit(
        &mut self,
        message_id: &MessageId,
        content: String,
        reason: Option<String>,
        max_length: usize,
        now: DateTime<Utc>,
    ) -> Result<&DiscussionMessage, MessageLogError> {
        Self::check_content(&content, max_length)?;
        let message = self.live_mut(message_id)?;
        let previous_content = std::mem::replace(&mut message.content, content);
        message.edit_history.push(EditRecord {
            previous_content,
            edited_at: now,
            reason,
        });
        message.is_edited = true;
        Ok(&*message)
    }

    /// Tombstone a message. Its content and history are retained.
    pub fn soft_delete(
        &mut self,
        message_id: &MessageId,
        now: DateTime<Utc>,
    ) -> Result<&DiscussionMessage, MessageLogError> {
        let message = self.live_mut(message_id)?;
        message.is_deleted = true;
        message.deleted_at = Some(now);
        Ok(&*message)
    }

    pub fn add_reaction(
        &mut self,
        message_id: &MessageId,
        participant_id: &ParticipantId,
        emoji: &str,
        now: DateTime<Utc>,
    ) -> Result<&DiscussionMessage, MessageLogError> {
        let message = self.live_mut(message_id)?;
        if message
            .reactions
            .iter()
            .any(|r| &r.participant_id == participant_id && r.emoji == emoji)
        {
            return Err(MessageLogError::DuplicateReaction {
                participant: participant_id.clone(),
                emoji: emoji.to_string(),
            });
        }
        message.reactions.push(Reaction {
            participant_id: participant_id.clone(),
            emoji: emoji.to_string(),
            created_at: now,
        });
        Ok(&*message)
    }

    fn live_mut(&mut self, message_id: &MessageId) -> Result<&mut DiscussionMessage, MessageLogError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| MessageLogError::UnknownMessage(message_id.clone()))?;
        if message.is_deleted {
            return Err(MessageLogError::Deleted(message_id.clone()));
        }
        Ok(message)
    }

    pub fn get(&self, message_id: &MessageId) -> Option<&DiscussionMessage> {
        self.messages.iter().find(|m| &m.id == message_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscussionMessage> {
        self.messages.iter()
    }

    /// Messages that have not been deleted, in order.
    pub fn visible(&self) -> impl Iterator<Item = &DiscussionMessage> {
        self.messages.iter().filter(|m| !m.is_deleted)
    }

    pub fn last(&self) -> Option<&DiscussionMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
