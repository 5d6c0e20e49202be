//! Request payloads accepted by the notification service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use notifyhub_entity::channel::{ChannelKind, preference::ChannelConfig};
use notifyhub_entity::notification::{NotificationData, NotificationType, Priority};

/// A request to create a notification.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[validate(length(max = 128), custom(function = "not_blank"))]
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[validate(length(max = 256), custom(function = "not_blank"))]
    pub title: String,
    #[validate(length(max = 4096), custom(function = "not_blank"))]
    pub message: String,
    #[serde(default)]
    pub data: NotificationData,
    /// Defaults to `normal`.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Empty means the realtime channels.
    #[serde(default)]
    pub channels: Vec<ChannelKind>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewNotification {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            notification_type,
            title: title.into(),
            message: message.into(),
            data: NotificationData::new(),
            priority: None,
            channels: Vec::new(),
            max_retries: None,
            scheduled_for: None,
            expires_at: None,
        }
    }

    pub fn with_channels(mut self, channels: impl IntoIterator<Item = ChannelKind>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    pub fn with_data(mut self, data: NotificationData) -> Self {
        self.data = data;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }
}

/// Body of a channel preference update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceUpdate {
    pub enabled: bool,
    /// Replaces the stored configuration when present.
    #[serde(default)]
    pub configuration: Option<ChannelConfig>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
