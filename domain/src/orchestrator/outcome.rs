//! Result of a committed orchestrator operation

use crate::core::id::MessageId;
use crate::event::{DiscussionEvent, DiscussionEventType, EventPayload};
use crate::turn::clock::ClockDirective;

/// Events to publish and the clock directive to apply, in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub events: Vec<DiscussionEvent>,
    pub clock: ClockDirective,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.clock == ClockDirective::Unchanged
    }

    pub fn event_types(&self) -> Vec<DiscussionEventType> {
        self.events.iter().map(|e| e.event_type()).collect()
    }

    /// Id of the message this operation created, if it created one.
    pub fn message_id(&self) -> Option<&MessageId> {
        self.events.iter().find_map(|e| match &e.payload {
            EventPayload::MessageSent { message_id, .. } => Some(message_id),
            _ => None,
        })
    }
}
