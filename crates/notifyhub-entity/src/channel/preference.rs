//! Per-user channel preference entity.

use chrono::{DateTime, Utc};
use notifyhub_core::types::UserId;
use serde::{Deserialize, Serialize};

use super::kind::ChannelKind;

/// Channel-specific settings (`address` for email, `phoneNumber` for SMS).
pub type ChannelConfig = serde_json::Map<String, serde_json::Value>;

/// Whether a user wants a channel, and where to reach them on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPreference {
    pub user_id: UserId,
    pub channel: ChannelKind,
    pub enabled: bool,
    #[serde(default)]
    pub configuration: ChannelConfig,
    /// `None` for a synthesized default that was never stored.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChannelPreference {
    /// Preference used when the user has not configured `channel`.
    pub fn default_for(user_id: UserId, channel: ChannelKind) -> Self {
        Self {
            user_id,
            channel,
            enabled: channel.enabled_by_default(),
            configuration: ChannelConfig::new(),
            updated_at: None,
        }
    }

    /// Destination email address, if configured.
    pub fn email_address(&self) -> Option<&str> {
        self.config_str(&["address", "email"])
    }

    /// Destination phone number, if configured.
    pub fn phone_number(&self) -> Option<&str> {
        self.config_str(&["phoneNumber", "phone_number", "phone"])
    }

    fn config_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.configuration.get(*key))
            .filter_map(|value| value.as_str())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}
