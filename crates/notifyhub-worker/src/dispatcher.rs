//! Channel dispatcher: one delivery attempt per enabled channel.

use std::sync::Arc;

use notifyhub_entity::channel::{ChannelKind, ChannelPreference};
use notifyhub_entity::delivery::DeliveryResult;
use notifyhub_entity::notification::Notification;
use notifyhub_realtime::{ConnectionRegistry, PushPayload, ServerMessage};
use notifyhub_service::{ChannelProviderRegistry, NotificationService, TemplateStore};

/// Why a single channel attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No live connection accepted the push.
    #[error("no open connection accepted the push")]
    NoConnection,

    /// The preference lacks an address or phone number.
    #[error("no {0} destination configured")]
    MissingDestination(ChannelKind),

    /// The provider returned false, errored, panicked or timed out.
    #[error("{0} provider did not accept the message")]
    ProviderRejected(ChannelKind),
}

/// Performs channel attempts for the delivery worker.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    connections: Arc<ConnectionRegistry>,
    providers: Arc<ChannelProviderRegistry>,
    templates: Arc<TemplateStore>,
}

impl ChannelDispatcher {
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        providers: Arc<ChannelProviderRegistry>,
        templates: Arc<TemplateStore>,
    ) -> Self {
        Self {
            connections,
            providers,
            templates,
        }
    }

    pub fn from_service(service: &NotificationService) -> Self {
        Self::new(
            service.connections().clone(),
            service.providers().clone(),
            service.templates().clone(),
        )
    }

    /// Attempts every requested channel whose preference is enabled.
    ///
    /// `websocket` and `in_app` share one push; the outcome is recorded for
    /// both so the user never receives the same notification twice.
    pub async fn dispatch(
        &self,
        notification: &Notification,
        preferences: &[ChannelPreference],
    ) -> Vec<DeliveryResult> {
        let mut results = Vec::new();
        let mut realtime_outcome: Option<Result<(), DispatchError>> = None;

        for channel in &notification.channels {
            let Some(preference) = preferences
                .iter()
                .find(|p| p.channel == *channel && p.enabled)
            else {
                tracing::debug!(
                    notification_id = %notification.id,
                    channel = %channel,
                    "Channel disabled, skipping"
                );
                continue;
            };

            let outcome = if channel.is_realtime() {
                realtime_outcome
                    .get_or_insert_with(|| self.push(notification, *channel))
                    .clone()
            } else {
                self.attempt_provider(notification, preference).await
            };

            results.push(match outcome {
                Ok(()) => DeliveryResult::delivered(*channel),
                Err(e) => {
                    tracing::debug!(
                        notification_id = %notification.id,
                        channel = %channel,
                        error = %e,
                        "Channel attempt failed"
                    );
                    DeliveryResult::failed(*channel, e.to_string())
                }
            });
        }

        results
    }

    fn push(&self, notification: &Notification, channel: ChannelKind) -> Result<(), DispatchError> {
        let rendered = self.templates.render(notification, channel);
        let payload = PushPayload {
            id: Some(notification.id),
            notification_type: Some(notification.notification_type),
            title: rendered.title,
            message: rendered.body,
            data: notification.data.clone(),
            priority: notification.priority,
        };
        let accepted = self
            .connections
            .send_to_user(&notification.user_id, ServerMessage::notification(payload));
        if accepted > 0 {
            Ok(())
        } else {
            Err(DispatchError::NoConnection)
        }
    }

    async fn attempt_provider(
        &self,
        notification: &Notification,
        preference: &ChannelPreference,
    ) -> Result<(), DispatchError> {
        let channel = preference.channel;
        let rendered = self.templates.render(notification, channel);

        let accepted = match channel {
            ChannelKind::Email => {
                let to = preference
                    .email_address()
                    .ok_or(DispatchError::MissingDestination(channel))?;
                let html = rendered.html.as_deref().unwrap_or(&rendered.body);
                self.providers
                    .send_email(to, &rendered.title, html, &rendered.body)
                    .await
            }
            ChannelKind::Sms => {
                let to = preference
                    .phone_number()
                    .ok_or(DispatchError::MissingDestination(channel))?;
                let body = format!("{}: {}", rendered.title, rendered.body);
                self.providers.send_sms(to, &body).await
            }
            ChannelKind::Websocket | ChannelKind::InApp => {
                return self.push(notification, channel);
            }
        };

        if accepted {
            Ok(())
        } else {
            Err(DispatchError::ProviderRejected(channel))
        }
    }
}
