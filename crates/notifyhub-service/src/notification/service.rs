//! Notification orchestration: creation, direct pushes, history, read
//! receipts and channel preferences.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use validator::Validate;

use notifyhub_core::config::delivery::DeliveryConfig;
use notifyhub_core::error::{AppError, ErrorKind};
use notifyhub_core::events::{DomainEvent, EventBus, NotificationEvent};
use notifyhub_core::result::AppResult;
use notifyhub_core::types::{NotificationId, UserId};
use notifyhub_entity::channel::{ChannelKind, ChannelPreference, preference::ChannelConfig};
use notifyhub_entity::notification::{Notification, NotificationType, Priority};
use notifyhub_realtime::metrics::MetricsSnapshot;
use notifyhub_realtime::{ConnectionRegistry, InboundAction, PushPayload, ServerMessage};
use notifyhub_store::{
    DeliveryQueue, NotificationFilter, NotificationPage, NotificationStore, QueueEntry,
};

use super::request::NewNotification;
use crate::provider::ChannelProviderRegistry;
use crate::template::TemplateStore;

/// Point-in-time counters for operators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub active_connections: usize,
    pub connected_users: usize,
    pub pending_deliveries: usize,
    pub email_providers: usize,
    pub sms_providers: usize,
    pub realtime: MetricsSnapshot,
}

/// The public face of the notification subsystem.
///
/// Constructed once at startup and shared behind an `Arc`. Creation only
/// persists and enqueues; delivery belongs to the worker, which reaches the
/// shared components through the accessors below.
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    queue: Arc<dyn DeliveryQueue>,
    connections: Arc<ConnectionRegistry>,
    providers: Arc<ChannelProviderRegistry>,
    templates: Arc<TemplateStore>,
    events: EventBus,
    config: DeliveryConfig,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        queue: Arc<dyn DeliveryQueue>,
        connections: Arc<ConnectionRegistry>,
        providers: Arc<ChannelProviderRegistry>,
        templates: Arc<TemplateStore>,
        events: EventBus,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            store,
            queue,
            connections,
            providers,
            templates,
            events,
            config,
        }
    }

    /// Validates, persists and enqueues a notification.
    ///
    /// Returns as soon as the record is queued; the caller learns about
    /// delivery only through later reads.
    pub async fn create_notification(&self, request: NewNotification) -> AppResult<Notification> {
        self.create_notification_at(request, Utc::now()).await
    }

    pub async fn create_notification_at(
        &self,
        request: NewNotification,
        now: DateTime<Utc>,
    ) -> AppResult<Notification> {
        request
            .validate()
            .map_err(|e| AppError::validation(format!("Invalid notification: {e}")))?;

        let max_retries = request.max_retries.unwrap_or(self.config.default_max_retries);
        if max_retries > self.config.max_retries_ceiling {
            return Err(AppError::validation(format!(
                "maxRetries must not exceed {}",
                self.config.max_retries_ceiling
            )));
        }

        let expires_at = request.expires_at.unwrap_or(now + self.config.expiry());
        if expires_at <= now {
            return Err(AppError::validation("expiresAt must be in the future"));
        }

        let channels = if request.channels.is_empty() {
            ChannelKind::ALL
                .iter()
                .copied()
                .filter(ChannelKind::is_realtime)
                .collect()
        } else {
            request.channels
        };

        let mut notification = Notification::pending(
            UserId::new(request.user_id.trim()),
            request.notification_type,
            request.title,
            request.message,
            channels,
            now,
            expires_at,
        );
        notification.data = request.data;
        notification.priority = request.priority.unwrap_or_default();
        notification.max_retries = max_retries;
        notification.scheduled_for = request.scheduled_for.filter(|at| *at > now);

        self.store.save_notification(&notification).await?;

        let available_at = notification.scheduled_for.unwrap_or(now);
        if let Err(e) = self
            .queue
            .enqueue(QueueEntry::new(notification.id, available_at))
            .await
        {
            // A stored record without a queue entry would never be delivered.
            if let Err(rollback) = self.store.delete_notification(notification.id).await {
                error!(
                    notification_id = %notification.id,
                    error = %rollback,
                    "Could not remove notification after enqueue failure"
                );
            }
            return Err(e);
        }

        info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            notification_type = %notification.notification_type,
            scheduled = notification.scheduled_for.is_some(),
            "Notification created"
        );

        self.events.publish(NotificationEvent::NotificationCreated {
            notification_id: notification.id,
            user_id: notification.user_id.clone(),
            notification_type: notification.notification_type.as_str().to_string(),
            priority: notification.priority.as_str().to_string(),
            channels: notification
                .channels
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
        });

        Ok(notification)
    }

    /// Best-effort push to every open connection of `user_id`.
    ///
    /// Returns how many connections accepted the message.
    pub fn send_realtime(&self, user_id: &UserId, payload: PushPayload) -> usize {
        let accepted = self
            .connections
            .send_to_user(user_id, ServerMessage::notification(payload));
        debug!(user_id = %user_id, accepted, "Realtime push");
        accepted
    }

    /// Fan-out to every connection subscribed to `topic`. Nothing is stored.
    pub fn broadcast_to_topic(&self, topic: &str, payload: PushPayload) -> AppResult<usize> {
        notifyhub_realtime::message::validator::validate_topic_name(topic)?;
        let reached = self
            .connections
            .broadcast_topic(topic, ServerMessage::broadcast(topic, payload));
        debug!(topic, reached, "Topic broadcast");
        Ok(reached)
    }

    pub async fn get_user_notifications(
        &self,
        user_id: &UserId,
        filter: &NotificationFilter,
    ) -> AppResult<NotificationPage> {
        self.store.query_notifications(user_id, filter).await
    }

    /// Marks a notification read on behalf of its owner.
    ///
    /// Repeating the call returns the record unchanged and emits nothing.
    pub async fn mark_as_read(
        &self,
        notification_id: NotificationId,
        user_id: &UserId,
    ) -> AppResult<Notification> {
        let now = Utc::now();
        let mut newly_read = false;
        let notification = self
            .store
            .modify_notification(notification_id, &mut |stored| {
                if &stored.user_id != user_id {
                    return Err(AppError::authorization(
                        "Notification does not belong to this user",
                    ));
                }
                if stored.read_at.is_some() {
                    return Ok(());
                }
                if !stored.status.is_readable() {
                    return Err(AppError::conflict(format!(
                        "Notification in status '{}' cannot be marked as read",
                        stored.status.as_str()
                    )));
                }
                stored.read_at = Some(now);
                stored.updated_at = now;
                newly_read = true;
                Ok(())
            })
            .await
            .inspect_err(|e| {
                if e.kind == ErrorKind::Authorization {
                    warn!(
                        notification_id = %notification_id,
                        user_id = %user_id,
                        "Read attempted by non-owner"
                    );
                }
            })?;

        if !newly_read {
            return Ok(notification);
        }

        self.events.publish(NotificationEvent::NotificationRead {
            notification_id,
            user_id: user_id.clone(),
            read_at: now,
        });

        let mut confirmation = PushPayload::new("Notification marked as read", "");
        confirmation.notification_type = Some(NotificationType::SystemMaintenance);
        confirmation.priority = Priority::Low;
        confirmation.data.insert("action".into(), json!("mark_read"));
        confirmation
            .data
            .insert("notificationId".into(), json!(notification_id));
        self.send_realtime(user_id, confirmation);

        Ok(notification)
    }

    /// Preferences for every known channel, defaults filled in.
    pub async fn get_channel_preferences(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<ChannelPreference>> {
        let stored = self.store.get_user_preferences(user_id).await?;
        Ok(ChannelKind::ALL
            .iter()
            .map(|kind| {
                stored
                    .iter()
                    .find(|p| p.channel == *kind)
                    .cloned()
                    .unwrap_or_else(|| ChannelPreference::default_for(user_id.clone(), *kind))
            })
            .collect())
    }

    /// Enables or disables a channel and optionally replaces its configuration.
    pub async fn update_channel_preferences(
        &self,
        user_id: &UserId,
        channel: &str,
        enabled: bool,
        configuration: Option<ChannelConfig>,
    ) -> AppResult<ChannelPreference> {
        let kind: ChannelKind = channel.parse()?;

        let mut preference = self
            .store
            .get_user_preferences(user_id)
            .await?
            .into_iter()
            .find(|p| p.channel == kind)
            .unwrap_or_else(|| ChannelPreference::default_for(user_id.clone(), kind));

        preference.enabled = enabled;
        if let Some(configuration) = configuration {
            preference.configuration = configuration;
        }
        validate_destination(&preference)?;
        preference.updated_at = Some(Utc::now());

        self.store.save_preference(&preference).await?;

        info!(user_id = %user_id, channel = %kind, enabled, "Channel preference updated");

        self.events.publish(NotificationEvent::ChannelUpdated {
            user_id: user_id.clone(),
            channel: kind.as_str().to_string(),
            enabled,
            configuration: Value::Object(preference.configuration.clone()),
        });

        Ok(preference)
    }

    /// Carries out follow-up work requested by an inbound socket message.
    ///
    /// Failures are reported back on the originating connection.
    pub async fn handle_inbound_action(
        &self,
        conn_id: &notifyhub_core::types::ConnectionId,
        action: InboundAction,
    ) {
        match action {
            InboundAction::MarkRead {
                user_id,
                notification_id,
            } => {
                if let Err(e) = self.mark_as_read(notification_id, &user_id).await {
                    self.connections
                        .send(conn_id, ServerMessage::from_app_error(&e));
                }
            }
        }
    }

    pub async fn stats(&self) -> AppResult<ServiceStats> {
        Ok(ServiceStats {
            active_connections: self.connections.connection_count(),
            connected_users: self.connections.connected_users(),
            pending_deliveries: self.queue.len().await?,
            email_providers: self.providers.email_provider_names().len(),
            sms_providers: self.providers.sms_provider_names().len(),
            realtime: self.connections.metrics(),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<dyn DeliveryQueue> {
        &self.queue
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn providers(&self) -> &Arc<ChannelProviderRegistry> {
        &self.providers
    }

    pub fn templates(&self) -> &Arc<TemplateStore> {
        &self.templates
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }
}

/// An enabled email or SMS channel needs somewhere to send to.
fn validate_destination(preference: &ChannelPreference) -> AppResult<()> {
    if !preference.enabled {
        return Ok(());
    }
    match preference.channel {
        ChannelKind::Email => match preference.email_address() {
            Some(address) if address.contains('@') => Ok(()),
            Some(_) => Err(AppError::validation("Invalid email address")),
            None => Err(AppError::validation(
                "Email channel requires configuration.address",
            )),
        },
        ChannelKind::Sms => match preference.phone_number() {
            Some(phone) if phone.chars().filter(char::is_ascii_digit).count() >= 6 => Ok(()),
            Some(_) => Err(AppError::validation("Invalid phone number")),
            None => Err(AppError::validation(
                "SMS channel requires configuration.phoneNumber",
            )),
        },
        ChannelKind::Websocket | ChannelKind::InApp => Ok(()),
    }
}
