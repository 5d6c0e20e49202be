//! Topic subscriptions used for broadcast fan-out.

pub mod registry;
pub mod subscription;

pub use registry::TopicRegistry;

/// Topic every connection joins on registration.
pub const GENERAL_TOPIC: &str = "general";
