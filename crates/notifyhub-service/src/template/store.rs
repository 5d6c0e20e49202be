//! Built-in templates keyed by notification type and channel.

use std::collections::HashMap;

use tracing::debug;

use notifyhub_entity::channel::ChannelKind;
use notifyhub_entity::notification::{Notification, NotificationType};
use notifyhub_entity::template::NotificationTemplate;

use super::render::{email_html, missing_variables, render_string};

/// Channel-ready text for one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedContent {
    pub title: String,
    pub body: String,
    /// Present for email only.
    pub html: Option<String>,
}

/// Lookup table of render templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<(NotificationType, ChannelKind), NotificationTemplate>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TemplateStore {
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Store preloaded with the built-in templates.
    pub fn with_defaults() -> Self {
        use ChannelKind::{Email, Sms, Websocket};
        use NotificationType::*;

        let mut store = Self::empty();
        for template in [
            NotificationTemplate::new(
                SecurityAlert,
                Email,
                "Security Alert - {{action}}",
                "A security event has been detected on your account: {{details}}",
                &["action", "details"],
            ),
            NotificationTemplate::new(
                SecurityAlert,
                Sms,
                "Security Alert",
                "{{action}} detected on your account",
                &["action"],
            ),
            NotificationTemplate::new(
                PayoutProcessed,
                Websocket,
                "Payout Processed",
                "Your payout of {{amount}} {{currency}} has been processed successfully",
                &["amount", "currency"],
            ),
            NotificationTemplate::new(
                PayoutProcessed,
                Email,
                "Payout Processed",
                "Your payout of {{amount}} {{currency}} has been processed successfully",
                &["amount", "currency"],
            ),
            NotificationTemplate::new(
                PayoutFailed,
                Email,
                "Payout Failed",
                "Your payout of {{amount}} {{currency}} could not be processed: {{reason}}",
                &["amount", "currency", "reason"],
            ),
            NotificationTemplate::new(
                ConversionApproved,
                Websocket,
                "Conversion Approved",
                "Your conversion for {{offerName}} was approved: {{amount}} {{currency}}",
                &["offerName", "amount", "currency"],
            ),
            NotificationTemplate::new(
                LoginNotification,
                Email,
                "New sign-in to your account",
                "We noticed a new sign-in from {{location}} on {{device}}",
                &["location", "device"],
            ),
            NotificationTemplate::new(
                FraudAlert,
                Sms,
                "Fraud Alert",
                "Suspicious activity flagged: {{reason}}",
                &["reason"],
            ),
        ] {
            store.insert(template);
        }
        store
    }

    /// Adds or replaces the template for its `(type, channel)` pair.
    pub fn insert(&mut self, template: NotificationTemplate) {
        self.templates
            .insert((template.notification_type, template.channel), template);
    }

    pub fn get(
        &self,
        notification_type: NotificationType,
        channel: ChannelKind,
    ) -> Option<&NotificationTemplate> {
        self.templates.get(&(notification_type, channel))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render `notification` for `channel`.
    ///
    /// Falls back to the raw title and message when no template exists or
    /// the data lacks one of the template's variables. Email always gets
    /// an HTML body.
    pub fn render(&self, notification: &Notification, channel: ChannelKind) -> RenderedContent {
        let template = self
            .get(notification.notification_type, channel)
            .filter(|template| {
                let missing = missing_variables(&template.variables, &notification.data);
                if !missing.is_empty() {
                    debug!(
                        notification_id = %notification.id,
                        channel = %channel,
                        missing = ?missing,
                        "Template variables missing, using raw content"
                    );
                }
                missing.is_empty()
            });

        let (title, body) = match template {
            Some(t) => (
                render_string(&t.title, &notification.data),
                render_string(&t.body, &notification.data),
            ),
            None => (notification.title.clone(), notification.message.clone()),
        };

        let html = (channel == ChannelKind::Email).then(|| {
            template
                .and_then(|t| t.html_body.as_deref())
                .map(|html| render_string(html, &notification.data))
                .unwrap_or_else(|| email_html(notification, &title, &body))
        });

        RenderedContent { title, body, html }
    }
}
