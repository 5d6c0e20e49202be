//! Notification priority and delivery status.

use std::fmt;
use std::str::FromStr;

use notifyhub_core::AppError;
use serde::{Deserialize, Serialize};

/// Urgency of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(AppError::validation(format!("Unknown priority '{other}'"))),
        }
    }
}

/// Where a notification is in the delivery state machine.
///
/// `Pending` is the only state the worker picks up. `Sent` marks an attempt
/// in flight. The last four states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    /// Some but not all attempted channels succeeded.
    PartiallyDelivered,
    Delivered,
    Failed,
    Expired,
}

impl NotificationStatus {
    /// Check if the notification can no longer re-enter the queue.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PartiallyDelivered | Self::Delivered | Self::Failed | Self::Expired
        )
    }

    /// Reached the user on at least one channel.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::PartiallyDelivered | Self::Delivered)
    }

    /// States from which a notification may be marked read.
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Sent | Self::PartiallyDelivered | Self::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::PartiallyDelivered => "partially_delivered",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
