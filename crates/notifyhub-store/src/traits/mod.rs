//! Storage and queue traits.

pub mod notification;
pub mod queue;

pub use notification::NotificationStore;
pub use queue::{DeliveryQueue, QueueEntry};
