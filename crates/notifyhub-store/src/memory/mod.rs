//! In-memory store and queue.

pub mod notification;
pub mod queue;

pub use notification::MemoryNotificationStore;
pub use queue::MemoryDeliveryQueue;
