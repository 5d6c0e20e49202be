//! Lifecycle events emitted by NotifyHub operations.
//!
//! Events are published on an [`EventBus`] and consumed by whoever cares
//! (metrics, audit). The delivery path never depends on a subscriber being
//! present.

pub mod notification;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub use notification::NotificationEvent;

/// Default number of events buffered for slow subscribers.
const DEFAULT_CAPACITY: usize = 1024;

/// Wrapper for all lifecycle events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: NotificationEvent,
}

impl DomainEvent {
    /// Create a new domain event stamped with the current time.
    pub fn new(payload: NotificationEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Fire-and-forget fan-out of [`DomainEvent`]s.
///
/// Publishing never blocks; subscribers that fall behind by more than the
/// buffer capacity observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers that received it.
    pub fn publish(&self, payload: NotificationEvent) -> usize {
        let event = DomainEvent::new(payload);
        tracing::trace!(event = event.payload.name(), "Publishing lifecycle event");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
