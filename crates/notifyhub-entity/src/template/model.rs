//! Notification template model.

use serde::{Deserialize, Serialize};

use crate::channel::ChannelKind;
use crate::notification::NotificationType;

/// Render template for one `(type, channel)` pair.
///
/// `title` and `body` contain `{{variable}}` placeholders filled from the
/// notification's `data`; `variables` lists the ones that must be present
/// for the template to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTemplate {
    pub notification_type: NotificationType,
    pub channel: ChannelKind,
    pub title: String,
    pub body: String,
    /// Optional HTML body for email.
    pub html_body: Option<String>,
    pub variables: Vec<String>,
}

impl NotificationTemplate {
    pub fn new(
        notification_type: NotificationType,
        channel: ChannelKind,
        title: impl Into<String>,
        body: impl Into<String>,
        variables: &[&str],
    ) -> Self {
        Self {
            notification_type,
            channel,
            title: title.into(),
            body: body.into(),
            html_body: None,
            variables: variables.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }
}
