//! Notification orchestration.

pub mod request;
pub mod service;

pub use request::{NewNotification, PreferenceUpdate};
pub use service::{NotificationService, ServiceStats};
