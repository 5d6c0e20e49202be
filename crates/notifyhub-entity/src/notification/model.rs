//! Notification entity model.

use chrono::{DateTime, Utc};
use notifyhub_core::types::{NotificationId, UserId};
use serde::{Deserialize, Serialize};

use super::kind::NotificationType;
use super::priority::{NotificationStatus, Priority};
use crate::channel::ChannelKind;

/// Opaque key/value payload carried with a notification.
pub type NotificationData = serde_json::Map<String, serde_json::Value>;

/// One delivery intent for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// Business event kind.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: NotificationData,
    pub priority: Priority,
    /// Requested channels, in order, without duplicates.
    pub channels: Vec<ChannelKind>,
    pub status: NotificationStatus,
    /// Number of failed attempts that were followed by a retry.
    pub retry_count: u32,
    pub max_retries: u32,
    /// Earliest dispatch time.
    pub scheduled_for: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Create a pending notification created at `now`.
    ///
    /// Channels are deduplicated keeping the first occurrence.
    pub fn pending(
        user_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        channels: impl IntoIterator<Item = ChannelKind>,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let mut ordered: Vec<ChannelKind> = Vec::new();
        for channel in channels {
            if !ordered.contains(&channel) {
                ordered.push(channel);
            }
        }

        Self {
            id: NotificationId::new(),
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            data: NotificationData::new(),
            priority: Priority::default(),
            channels: ordered,
            status: NotificationStatus::Pending,
            retry_count: 0,
            max_retries: 0,
            scheduled_for: None,
            expires_at,
            created_at: now,
            updated_at: now,
            read_at: None,
            delivered_at: None,
            failed_at: None,
        }
    }

    /// Check if the notification has been read.
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Past its deadline at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// `scheduledFor` has been reached (or was never set).
    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.is_none_or(|at| at <= now)
    }

    /// Total attempts made so far, counting the one in flight.
    pub fn attempt_number(&self) -> u32 {
        self.retry_count + 1
    }

    /// Whether a failed attempt may still be retried.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn mark_delivered(&mut self, status: NotificationStatus, now: DateTime<Utc>) {
        debug_assert!(status.is_delivered());
        self.status = status;
        self.delivered_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, now: DateTime<Utc>) {
        self.status = NotificationStatus::Failed;
        self.failed_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_expired(&mut self, now: DateTime<Utc>) {
        self.status = NotificationStatus::Expired;
        self.updated_at = now;
    }

    /// Put the record back to `pending` after a failed attempt.
    pub fn schedule_retry(&mut self, now: DateTime<Utc>) {
        self.retry_count += 1;
        self.status = NotificationStatus::Pending;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(now: DateTime<Utc>) -> Notification {
        Notification::pending(
            UserId::from("u1"),
            NotificationType::PayoutProcessed,
            "Payout",
            "Your payout was sent",
            [ChannelKind::Websocket, ChannelKind::Email, ChannelKind::Websocket],
            now,
            now + Duration::hours(24),
        )
    }

    #[test]
    fn test_pending_dedups_channels() {
        let n = sample(Utc::now());
        assert_eq!(n.channels, vec![ChannelKind::Websocket, ChannelKind::Email]);
        assert_eq!(n.status, NotificationStatus::Pending);
        assert!(n.is_unread());
    }

    #[test]
    fn test_due_and_expiry() {
        let now = Utc::now();
        let mut n = sample(now);
        assert!(n.is_due_at(now));
        n.scheduled_for = Some(now + Duration::minutes(10));
        assert!(!n.is_due_at(now));
        assert!(n.is_due_at(now + Duration::minutes(10)));
        assert!(!n.is_expired_at(now + Duration::hours(24)));
        assert!(n.is_expired_at(now + Duration::hours(24) + Duration::seconds(1)));
    }

    #[test]
    fn test_retry_bookkeeping() {
        let now = Utc::now();
        let mut n = sample(now);
        n.max_retries = 1;
        assert!(n.can_retry());
        n.schedule_retry(now);
        assert_eq!(n.retry_count, 1);
        assert_eq!(n.attempt_number(), 2);
        assert!(!n.can_retry());
        n.mark_failed(now);
        assert!(n.status.is_terminal());
        assert_eq!(n.failed_at, Some(now));
    }

    #[test]
    fn test_wire_shape() {
        let n = sample(Utc::now());
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "payout_processed");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["retryCount"], 0);
        assert_eq!(json["channels"], serde_json::json!(["websocket", "email"]));
    }
}
