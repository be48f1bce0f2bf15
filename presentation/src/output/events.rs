//! Live event printing
//!
//! [`ConsoleEventPrinter`] subscribes to a hub and prints one line per
//! discussion event as it is published.

use colored::Colorize;
use colloquy_application::EventSubscriber;
use colloquy_domain::util::preview;
use colloquy_domain::{DiscussionEvent, EventPayload, LeaveReason};

const MESSAGE_PREVIEW: usize = 72;

/// Prints discussion events to stdout
pub struct ConsoleEventPrinter {
    /// Show typing indicators too
    show_typing: bool,
}

impl ConsoleEventPrinter {
    pub fn new() -> Self {
        Self { show_typing: false }
    }

    pub fn with_typing(mut self, show: bool) -> Self {
        self.show_typing = show;
        self
    }

    /// One line describing `event`, or `None` for events not worth a line.
    pub fn format_event(&self, event: &DiscussionEvent) -> Option<String> {
        let who = event
            .participant_id
            .as_ref()
            .map(|p| p.as_str())
            .unwrap_or("-");
        let seq = format!("#{:<4}", event.sequence).dimmed();

        let body = match &event.payload {
            EventPayload::ParticipantJoined { role, rejoined } => {
                let verb = if *rejoined { "rejoined" } else { "joined" };
                format!("{} {} as {}", who.bold(), verb, role.as_str())
            }
            EventPayload::ParticipantLeft { reason } => match reason {
                LeaveReason::Left => format!("{} left", who.bold()),
                LeaveReason::MaxSkips => {
                    format!("{} {}", who.bold(), "deactivated after repeated silence".red())
                }
            },
            EventPayload::MessageSent {
                content,
                turn_number,
                ..
            } => format!(
                "{} {} {}",
                format!("[{}]", turn_number).dimmed(),
                format!("{}:", who).yellow().bold(),
                preview(content, MESSAGE_PREVIEW)
            ),
            EventPayload::MessageEdited { message_id, .. } => {
                format!("{} edited {}", who.bold(), message_id)
            }
            EventPayload::MessageDeleted { message_id } => {
                format!("{} deleted {}", who.bold(), message_id)
            }
            EventPayload::TurnChanged {
                current,
                turn_number,
                reason,
                fallback,
                ..
            } => {
                let next = match current {
                    Some(p) => p.as_str().green().bold().to_string(),
                    None => "(open floor)".dimmed().to_string(),
                };
                let mut line = format!("turn {} → {} ({})", turn_number, next, reason.as_str());
                if *fallback {
                    line.push_str(&format!(" {}", "fallback".yellow()));
                }
                line.cyan().to_string()
            }
            EventPayload::StatusChanged {
                from, to, reason, ..
            } => {
                let mut line = format!("status {} → {}", from.as_str(), to.as_str().bold());
                if let Some(reason) = reason {
                    line.push_str(&format!(": {}", reason));
                }
                line.magenta().to_string()
            }
            EventPayload::SettingsUpdated { .. } => format!("{} updated settings", who.bold()),
            EventPayload::ReactionAdded { message_id, emoji } => {
                format!("{} reacted {} to {}", who.bold(), emoji, message_id)
            }
            EventPayload::TypingStarted | EventPayload::TypingStopped if !self.show_typing => {
                return None;
            }
            EventPayload::TypingStarted => format!("{} is typing…", who).dimmed().to_string(),
            EventPayload::TypingStopped => format!("{} stopped typing", who).dimmed().to_string(),
        };
        Some(format!("{} {}", seq, body))
    }
}

impl Default for ConsoleEventPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for ConsoleEventPrinter {
    fn name(&self) -> &str {
        "console"
    }

    fn on_event(&self, event: &DiscussionEvent) {
        if let Some(line) = self.format_event(event) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use colloquy_domain::{
        DiscussionId, DiscussionPhase, EventId, MessageId, MessageType, ParticipantId,
        TurnEndReason,
    };

    fn event(payload: EventPayload) -> DiscussionEvent {
        colored::control::set_override(false);
        DiscussionEvent {
            id: EventId::generate(),
            discussion_id: DiscussionId::new("d-1"),
            sequence: 7,
            participant_id: Some(ParticipantId::new("alice")),
            timestamp: Utc::now(),
            payload,
        }
    }

    #[test]
    fn test_message_line() {
        let line = ConsoleEventPrinter::new()
            .format_event(&event(EventPayload::MessageSent {
                message_id: MessageId::new("m-1"),
                message_type: MessageType::default(),
                turn_number: 3,
                reply_to: None,
                content: "We should\nship it".to_string(),
            }))
            .unwrap();
        assert!(line.contains("#7"));
        assert!(line.contains("[3] alice: We should ship it"));
    }

    #[test]
    fn test_turn_change_line() {
        let line = ConsoleEventPrinter::new()
            .format_event(&event(EventPayload::TurnChanged {
                previous: Some(ParticipantId::new("alice")),
                current: Some(ParticipantId::new("bob")),
                turn_number: 4,
                reason: TurnEndReason::Timeout,
                phase: DiscussionPhase::Discussion,
                expected_end_at: None,
                fallback: true,
            }))
            .unwrap();
        assert!(line.contains("turn 4 → bob (timeout)"));
        assert!(line.contains("fallback"));
    }

    #[test]
    fn test_deactivation_line() {
        let line = ConsoleEventPrinter::new()
            .format_event(&event(EventPayload::ParticipantLeft {
                reason: LeaveReason::MaxSkips,
            }))
            .unwrap();
        assert!(line.contains("alice deactivated"));
    }

    #[test]
    fn test_typing_hidden_by_default() {
        let printer = ConsoleEventPrinter::new();
        assert!(printer.format_event(&event(EventPayload::TypingStarted)).is_none());
        let printer = printer.with_typing(true);
        assert!(printer.format_event(&event(EventPayload::TypingStarted)).is_some());
    }
}
