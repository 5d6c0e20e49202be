//! History query filters.

use notifyhub_core::types::Pagination;
use notifyhub_entity::notification::{Notification, NotificationType, Priority};
use serde::{Deserialize, Serialize};

/// Filters for a user's notification history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    #[serde(flatten)]
    pub page: Pagination,
    #[serde(default)]
    pub unread_only: bool,
    /// Empty means every type.
    #[serde(default)]
    pub types: Vec<NotificationType>,
    pub priority: Option<Priority>,
}

impl NotificationFilter {
    /// Whether `notification` passes every filter except pagination.
    pub fn matches(&self, notification: &Notification) -> bool {
        if self.unread_only && !notification.is_unread() {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&notification.notification_type) {
            return false;
        }
        if let Some(priority) = self.priority {
            if notification.priority != priority {
                return false;
            }
        }
        true
    }
}

/// One page of history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    /// Newest first.
    pub items: Vec<Notification>,
    /// Matches before pagination.
    pub total: usize,
    /// Unread notifications of the user, regardless of filters.
    pub unread_count: usize,
}
