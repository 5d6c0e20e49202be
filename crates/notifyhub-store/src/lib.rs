//! # notifyhub-store
//!
//! Persistence seams for NotifyHub. The delivery path only talks to the
//! [`NotificationStore`] and [`DeliveryQueue`] traits; the in-memory
//! implementations here back a single-instance deployment and the tests.
//! A durable backend replaces them without touching delivery logic, since
//! the queue only carries notification ids.

pub mod filter;
pub mod memory;
pub mod traits;

pub use filter::{NotificationFilter, NotificationPage};
pub use memory::{MemoryDeliveryQueue, MemoryNotificationStore};
pub use traits::{DeliveryQueue, NotificationStore, QueueEntry};
