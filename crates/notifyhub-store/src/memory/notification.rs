//! In-memory notification store backed by `DashMap`.

use std::cmp::Reverse;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;
use notifyhub_core::types::{NotificationId, UserId};
use notifyhub_entity::channel::{ChannelKind, ChannelPreference};
use notifyhub_entity::notification::Notification;

use crate::filter::{NotificationFilter, NotificationPage};
use crate::traits::NotificationStore;

/// Process-local [`NotificationStore`].
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    notifications: DashMap<NotificationId, Notification>,
    preferences: DashMap<UserId, Vec<ChannelPreference>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored notifications across all users.
    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn save_notification(&self, notification: &Notification) -> AppResult<()> {
        match self.notifications.entry(notification.id) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Notification {} already exists",
                notification.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(notification.clone());
                debug!(notification_id = %notification.id, "Notification saved");
                Ok(())
            }
        }
    }

    async fn update_notification(&self, notification: &Notification) -> AppResult<()> {
        match self.notifications.get_mut(&notification.id) {
            Some(mut stored) => {
                *stored = notification.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!(
                "Notification {} not found",
                notification.id
            ))),
        }
    }

    async fn modify_notification(
        &self,
        id: NotificationId,
        change: &mut (dyn for<'n> FnMut(&'n mut Notification) -> AppResult<()> + Send),
    ) -> AppResult<Notification> {
        let mut stored = self
            .notifications
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;

        let mut next = stored.clone();
        change(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete_notification(&self, id: NotificationId) -> AppResult<bool> {
        Ok(self.notifications.remove(&id).is_some())
    }

    async fn get_notification(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|n| n.value().clone()))
    }

    async fn query_notifications(
        &self,
        user_id: &UserId,
        filter: &NotificationFilter,
    ) -> AppResult<NotificationPage> {
        let mut unread_count = 0;
        let mut matching: Vec<Notification> = Vec::new();

        for entry in self.notifications.iter() {
            let notification = entry.value();
            if &notification.user_id != user_id {
                continue;
            }
            if notification.is_unread() {
                unread_count += 1;
            }
            if filter.matches(notification) {
                matching.push(notification.clone());
            }
        }

        matching.sort_by_key(|n| Reverse(n.created_at));
        let total = matching.len();

        Ok(NotificationPage {
            items: filter.page.apply(matching),
            total,
            unread_count,
        })
    }

    async fn get_user_preferences(&self, user_id: &UserId) -> AppResult<Vec<ChannelPreference>> {
        Ok(self
            .preferences
            .get(user_id)
            .map(|prefs| prefs.value().clone())
            .unwrap_or_default())
    }

    async fn save_preference(&self, preference: &ChannelPreference) -> AppResult<()> {
        let mut prefs = self
            .preferences
            .entry(preference.user_id.clone())
            .or_default();

        match prefs.iter_mut().find(|p| p.channel == preference.channel) {
            Some(existing) => *existing = preference.clone(),
            None => {
                prefs.push(preference.clone());
                prefs.sort_by_key(|p| channel_rank(p.channel));
            }
        }
        Ok(())
    }
}

fn channel_rank(channel: ChannelKind) -> usize {
    ChannelKind::ALL
        .iter()
        .position(|c| *c == channel)
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use notifyhub_core::error::ErrorKind;
    use notifyhub_core::types::Pagination;
    use notifyhub_entity::notification::{NotificationStatus, NotificationType, Priority};

    fn notification(user: &str, kind: NotificationType, minutes_ago: i64) -> Notification {
        let created = Utc::now() - Duration::minutes(minutes_ago);
        Notification::pending(
            UserId::from(user),
            kind,
            "title",
            "message",
            [ChannelKind::Websocket],
            created,
            created + Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn test_save_twice_conflicts() {
        let store = MemoryNotificationStore::new();
        let n = notification("u1", NotificationType::AccountUpdate, 0);
        store.save_notification(&n).await.unwrap();
        let err = store.save_notification(&n).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryNotificationStore::new();
        let n = notification("u1", NotificationType::AccountUpdate, 0);
        let err = store.update_notification(&n).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_modify_applies_to_current_record() {
        let store = MemoryNotificationStore::new();
        let n = notification("u1", NotificationType::AccountUpdate, 0);
        store.save_notification(&n).await.unwrap();

        let read_at = Utc::now();
        store
            .modify_notification(n.id, &mut |stored| {
                stored.read_at = Some(read_at);
                Ok(())
            })
            .await
            .unwrap();

        // A writer holding the pre-read copy only touches its own fields.
        let stale = n.clone();
        let updated = store
            .modify_notification(stale.id, &mut |stored| {
                stored.mark_delivered(NotificationStatus::Delivered, read_at);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(updated.read_at, Some(read_at));
        assert_eq!(updated.status, NotificationStatus::Delivered);
    }

    #[tokio::test]
    async fn test_modify_error_leaves_record_untouched() {
        let store = MemoryNotificationStore::new();
        let n = notification("u1", NotificationType::AccountUpdate, 0);
        store.save_notification(&n).await.unwrap();

        let err = store
            .modify_notification(n.id, &mut |stored| {
                stored.retry_count = 7;
                Err(AppError::conflict("refused"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        let stored = store.get_notification(n.id).await.unwrap().unwrap();
        assert_eq!(stored.retry_count, 0);

        let err = store
            .modify_notification(NotificationId::new(), &mut |_| Ok(()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryNotificationStore::new();
        let n = notification("u1", NotificationType::AccountUpdate, 0);
        store.save_notification(&n).await.unwrap();
        assert!(store.delete_notification(n.id).await.unwrap());
        assert!(!store.delete_notification(n.id).await.unwrap());
        assert_eq!(store.notification_count(), 0);
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let store = MemoryNotificationStore::new();
        let old = notification("u1", NotificationType::PayoutProcessed, 30);
        let mut read = notification("u1", NotificationType::FraudAlert, 20);
        read.read_at = Some(Utc::now());
        read.priority = Priority::Critical;
        let newest = notification("u1", NotificationType::PayoutProcessed, 10);
        let other_user = notification("u2", NotificationType::PayoutProcessed, 5);
        for n in [&old, &read, &newest, &other_user] {
            store.save_notification(n).await.unwrap();
        }

        let all = store
            .query_notifications(&UserId::from("u1"), &NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.unread_count, 2);
        assert_eq!(all.items[0].id, newest.id);
        assert_eq!(all.items[2].id, old.id);

        let unread_payouts = NotificationFilter {
            unread_only: true,
            types: vec![NotificationType::PayoutProcessed],
            ..Default::default()
        };
        let page = store
            .query_notifications(&UserId::from("u1"), &unread_payouts)
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let critical = NotificationFilter {
            priority: Some(Priority::Critical),
            ..Default::default()
        };
        let page = store
            .query_notifications(&UserId::from("u1"), &critical)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, read.id);
        assert_eq!(page.unread_count, 2);
    }

    #[tokio::test]
    async fn test_query_pagination_reports_total() {
        let store = MemoryNotificationStore::new();
        for i in 0..5 {
            store
                .save_notification(&notification("u1", NotificationType::BalanceUpdate, i))
                .await
                .unwrap();
        }
        let filter = NotificationFilter {
            page: Pagination::new(2, 4),
            ..Default::default()
        };
        let page = store
            .query_notifications(&UserId::from("u1"), &filter)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_preference_upsert() {
        let store = MemoryNotificationStore::new();
        let user = UserId::from("u1");
        let mut email = ChannelPreference::default_for(user.clone(), ChannelKind::Email);
        email.enabled = true;
        store.save_preference(&email).await.unwrap();
        store
            .save_preference(&ChannelPreference::default_for(user.clone(), ChannelKind::Websocket))
            .await
            .unwrap();
        email.enabled = false;
        store.save_preference(&email).await.unwrap();

        let prefs = store.get_user_preferences(&user).await.unwrap();
        assert_eq!(prefs.len(), 2);
        assert_eq!(prefs[0].channel, ChannelKind::Websocket);
        assert!(!prefs[1].enabled);
        assert!(store
            .get_user_preferences(&UserId::from("nobody"))
            .await
            .unwrap()
            .is_empty());
    }
}
