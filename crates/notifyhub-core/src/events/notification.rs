//! Notification lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{NotificationId, UserId};

/// State changes observers may react to (metrics exporters, audit sinks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A notification was accepted and queued.
    NotificationCreated {
        notification_id: NotificationId,
        user_id: UserId,
        notification_type: String,
        priority: String,
        channels: Vec<String>,
    },
    /// A user marked a notification as read.
    NotificationRead {
        notification_id: NotificationId,
        user_id: UserId,
        read_at: DateTime<Utc>,
    },
    /// A user changed a channel preference.
    ChannelUpdated {
        user_id: UserId,
        channel: String,
        enabled: bool,
        configuration: Value,
    },
    /// At least one channel accepted the notification.
    NotificationDelivered {
        notification_id: NotificationId,
        user_id: UserId,
        /// `delivered` or `partially_delivered`.
        status: String,
        succeeded: Vec<String>,
        failed: Vec<String>,
        attempt: u32,
    },
    /// Every attempted channel failed; another attempt is queued.
    NotificationRetryScheduled {
        notification_id: NotificationId,
        user_id: UserId,
        retry_count: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Retries are exhausted.
    NotificationFailed {
        notification_id: NotificationId,
        user_id: UserId,
        attempts: u32,
    },
    /// The notification passed `expiresAt` before it could be delivered.
    NotificationExpired {
        notification_id: NotificationId,
        user_id: UserId,
    },
}

impl NotificationEvent {
    /// Stable event name, identical to the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotificationCreated { .. } => "notification_created",
            Self::NotificationRead { .. } => "notification_read",
            Self::ChannelUpdated { .. } => "channel_updated",
            Self::NotificationDelivered { .. } => "notification_delivered",
            Self::NotificationRetryScheduled { .. } => "notification_retry_scheduled",
            Self::NotificationFailed { .. } => "notification_failed",
            Self::NotificationExpired { .. } => "notification_expired",
        }
    }

    /// The user the event concerns.
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::NotificationCreated { user_id, .. }
            | Self::NotificationRead { user_id, .. }
            | Self::ChannelUpdated { user_id, .. }
            | Self::NotificationDelivered { user_id, .. }
            | Self::NotificationRetryScheduled { user_id, .. }
            | Self::NotificationFailed { user_id, .. }
            | Self::NotificationExpired { user_id, .. } => user_id,
        }
    }
}
