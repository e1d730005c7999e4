//! Broadcast event bus for distributing `ProgressionEvent` to subscribers.
//!
//! Built on `tokio::sync::broadcast`. Events are published only after the
//! transition that produced them has been committed. Publishing with no
//! active subscribers is a no-op.

use skillpath_types::event::ProgressionEvent;
use tokio::sync::broadcast;

/// Multi-consumer bus for committed progression events.
///
/// Cloning the bus clones the sender, so every clone feeds the same
/// subscribers.
pub struct EventBus {
    sender: broadcast::Sender<ProgressionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: ProgressionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ProgressionEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
