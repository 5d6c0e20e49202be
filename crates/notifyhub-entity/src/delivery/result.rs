//! Outcome of one channel attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelKind;

/// Outcome of attempting one channel for one notification.
///
/// Transient: it drives the status transition and logging, and is never
/// stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub channel: ChannelKind,
    pub success: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(channel: ChannelKind) -> Self {
        Self {
            channel,
            success: true,
            delivered_at: Some(Utc::now()),
            error: None,
        }
    }

    pub fn failed(channel: ChannelKind, error: impl Into<String>) -> Self {
        Self {
            channel,
            success: false,
            delivered_at: None,
            error: Some(error.into()),
        }
    }
}
