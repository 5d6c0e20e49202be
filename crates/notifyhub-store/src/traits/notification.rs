//! Notification and preference storage.

use async_trait::async_trait;
use notifyhub_core::result::AppResult;
use notifyhub_core::types::{NotificationId, UserId};
use notifyhub_entity::channel::ChannelPreference;
use notifyhub_entity::notification::Notification;

use crate::filter::{NotificationFilter, NotificationPage};

/// Durable home of notification records and channel preferences.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug {
    /// Insert a new record. Fails with a conflict if the id exists.
    async fn save_notification(&self, notification: &Notification) -> AppResult<()>;

    /// Replace an existing record. Fails with not-found if it is missing.
    async fn update_notification(&self, notification: &Notification) -> AppResult<()>;

    /// Apply `change` to the current record as one atomic step and return
    /// the result.
    ///
    /// Writers that own different fields (the worker owns the delivery
    /// state, readers own `read_at`) go through here so neither overwrites
    /// the other. An error from `change` leaves the record untouched. Fails
    /// with not-found if the record is missing.
    async fn modify_notification(
        &self,
        id: NotificationId,
        change: &mut (dyn for<'n> FnMut(&'n mut Notification) -> AppResult<()> + Send),
    ) -> AppResult<Notification>;

    /// Remove a record. Returns whether it existed.
    async fn delete_notification(&self, id: NotificationId) -> AppResult<bool>;

    async fn get_notification(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Filtered, paginated history of one user, newest first.
    async fn query_notifications(
        &self,
        user_id: &UserId,
        filter: &NotificationFilter,
    ) -> AppResult<NotificationPage>;

    /// Preferences the user has stored. Channels never configured are absent.
    async fn get_user_preferences(&self, user_id: &UserId) -> AppResult<Vec<ChannelPreference>>;

    /// Insert or replace the preference for `(user, channel)`.
    async fn save_preference(&self, preference: &ChannelPreference) -> AppResult<()>;
}
