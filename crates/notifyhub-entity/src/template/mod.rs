//! Render templates.

pub mod model;

pub use model::NotificationTemplate;
