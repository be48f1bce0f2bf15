//! Event fan-out
//!
//! Every subscriber gets its own unbounded queue and forwarding task, so
//! events reach each subscriber in the order they were committed while a
//! slow subscriber only delays itself.

use crate::ports::event_subscriber::EventSubscriber;
use colloquy_domain::DiscussionEvent;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

struct Slot {
    name: String,
    tx: mpsc::UnboundedSender<DiscussionEvent>,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct EventEmitter {
    slots: Mutex<Vec<Slot>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver future events to `subscriber` on a dedicated task.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<DiscussionEvent>();
        let name = subscriber.name().to_string();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                subscriber.on_event(&event);
            }
        });
        debug!(subscriber = %name, "Event subscriber registered");
        self.slots().push(Slot {
            name,
            tx,
            task: Some(task),
        });
    }

    /// Receive future events on a channel instead of a callback.
    pub fn channel(&self, name: impl Into<String>) -> mpsc::UnboundedReceiver<DiscussionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.slots().push(Slot {
            name: name.into(),
            tx,
            task: None,
        });
        rx
    }

    /// Queue `events` for every subscriber. Subscribers whose receiving end
    /// is gone are dropped.
    pub fn emit(&self, events: &[DiscussionEvent]) {
        if events.is_empty() {
            return;
        }
        self.slots().retain(|slot| {
            for event in events {
                if slot.tx.send(event.clone()).is_err() {
                    debug!(subscriber = %slot.name, "Subscriber gone, removing");
                    return false;
                }
            }
            true
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.slots().len()
    }

    /// Stop accepting events and wait until every subscriber task has
    /// drained its queue.
    pub async fn close(&self) {
        let slots = std::mem::take(&mut *self.slots());
        let mut tasks = Vec::new();
        for slot in slots {
            drop(slot.tx);
            if let Some(task) = slot.task {
                tasks.push(task);
            }
        }
        futures::future::join_all(tasks).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_domain::{DiscussionId, EventId, EventPayload};
    use chrono::Utc;

    struct Recorder {
        seen: Mutex<Vec<u64>>,
    }

    impl EventSubscriber for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_event(&self, event: &DiscussionEvent) {
            self.seen.lock().unwrap().push(event.sequence);
        }
    }

    fn event(sequence: u64) -> DiscussionEvent {
        DiscussionEvent {
            id: EventId::generate(),
            discussion_id: DiscussionId::new("d-1"),
            sequence,
            participant_id: None,
            timestamp: Utc::now(),
            payload: EventPayload::TypingStarted,
        }
    }

    #[tokio::test]
    async fn test_subscriber_sees_events_in_order() {
        let emitter = EventEmitter::new();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        emitter.subscribe(recorder.clone());

        emitter.emit(&[event(1), event(2)]);
        emitter.emit(&[event(3)]);
        emitter.close().await;

        assert_eq!(*recorder.seen.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_channel_is_removed() {
        let emitter = EventEmitter::new();
        let mut kept = emitter.channel("kept");
        let dropped = emitter.channel("dropped");
        drop(dropped);

        emitter.emit(&[event(1)]);
        assert_eq!(emitter.subscriber_count(), 1);
        assert_eq!(kept.recv().await.map(|e| e.sequence), Some(1));
    }
}
