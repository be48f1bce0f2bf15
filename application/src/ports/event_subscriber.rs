//! Port for discussion event delivery.
//!
//! Defines the [`EventSubscriber`] trait. Every committed orchestrator
//! operation publishes its [`DiscussionEvent`]s to each subscriber, in
//! sequence order per discussion.
//!
//! Delivery is push-only and decoupled from the worker: a slow subscriber
//! delays only itself, never the discussion.

use colloquy_domain::DiscussionEvent;

/// Port for receiving discussion events.
///
/// `on_event` is synchronous and non-fallible; implementations that do I/O
/// should log their own failures.
pub trait EventSubscriber: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Handle one event.
    fn on_event(&self, event: &DiscussionEvent);
}

/// No-op implementation for tests and when nothing listens.
pub struct NoEventSubscriber;

impl EventSubscriber for NoEventSubscriber {
    fn name(&self) -> &str {
        "none"
    }

    fn on_event(&self, _event: &DiscussionEvent) {}
}
