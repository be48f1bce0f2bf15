//! Identifier value objects
//!
//! Every aggregate and entity in a discussion is addressed by an opaque
//! string identifier. Callers may supply their own (e.g. database UUIDs from
//! the excluded persistence layer) or generate fresh v4 UUIDs.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a new random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identity of a discussion (the aggregate root).
    DiscussionId
);

string_id!(
    /// Identity of a participant *within* one discussion.
    ///
    /// Distinct from [`AgentId`]: the same agent joining two discussions gets
    /// two participant ids.
    ParticipantId
);

string_id!(
    /// Identity of the agent (or human) behind a participant.
    AgentId
);

string_id!(
    /// Identity of a message.
    MessageId
);

string_id!(
    /// Identity of an emitted discussion event.
    EventId
);
