//! # notifyhub-service
//!
//! Orchestration layer for NotifyHub. [`NotificationService`] is the single
//! entry point for upstream callers; it composes the store, the delivery
//! queue, the connection registry, the channel provider registry and the
//! template store.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod notification;
pub mod provider;
pub mod template;

pub use notification::{NewNotification, NotificationService, PreferenceUpdate, ServiceStats};
pub use provider::{ChannelProviderRegistry, EmailProvider, SmsProvider};
pub use template::{RenderedContent, TemplateStore};
