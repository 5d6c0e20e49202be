//! Inbound and outbound WebSocket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use notifyhub_core::error::{AppError, ErrorKind};
use notifyhub_core::types::{ConnectionId, NotificationId, UserId};
use notifyhub_entity::notification::{NotificationData, NotificationType, Priority};

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Heartbeat; answered with `pong`.
    Ping,
    /// Join a topic.
    Subscribe { channel: String },
    /// Leave a topic.
    Unsubscribe { channel: String },
    /// Mark a notification as read.
    MarkRead { notification_id: String },
}

/// Content pushed to a user or a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    /// Set when the push mirrors a stored notification.
    #[serde(default)]
    pub id: Option<NotificationId>,
    #[serde(default)]
    pub notification_type: Option<NotificationType>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: NotificationData,
    #[serde(default)]
    pub priority: Priority,
}

impl PushPayload {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            notification_type: None,
            title: title.into(),
            message: message.into(),
            data: NotificationData::new(),
            priority: Priority::default(),
        }
    }
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First message on every new connection.
    ConnectionEstablished {
        user_id: UserId,
        connection_id: ConnectionId,
        subscriptions: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
    Subscribed {
        channel: String,
        timestamp: DateTime<Utc>,
    },
    Unsubscribed {
        channel: String,
        timestamp: DateTime<Utc>,
    },
    /// A notification addressed to the user.
    Notification {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<NotificationId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notification_type: Option<NotificationType>,
        title: String,
        message: String,
        data: NotificationData,
        priority: Priority,
        timestamp: DateTime<Utc>,
    },
    /// A message fanned out to a topic.
    Broadcast {
        channel: String,
        title: String,
        message: String,
        data: NotificationData,
        priority: Priority,
        timestamp: DateTime<Utc>,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn notification(payload: PushPayload) -> Self {
        Self::Notification {
            id: payload.id,
            notification_type: payload.notification_type,
            title: payload.title,
            message: payload.message,
            data: payload.data,
            priority: payload.priority,
            timestamp: Utc::now(),
        }
    }

    pub fn broadcast(topic: impl Into<String>, payload: PushPayload) -> Self {
        Self::Broadcast {
            channel: topic.into(),
            title: payload.title,
            message: payload.message,
            data: payload.data,
            priority: payload.priority,
            timestamp: Utc::now(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error reply describing a rejected client request.
    pub fn from_app_error(err: &AppError) -> Self {
        let code = match err.kind {
            ErrorKind::Validation => "INVALID_REQUEST",
            ErrorKind::Authorization => "FORBIDDEN",
            ErrorKind::Authentication => "UNAUTHORIZED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            _ => "INTERNAL_ERROR",
        };
        Self::error(code, err.message.clone())
    }

    /// Wire name of the message, e.g. `"connection_established"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "connection_established",
            Self::Pong { .. } => "pong",
            Self::Subscribed { .. } => "subscribed",
            Self::Unsubscribed { .. } => "unsubscribed",
            Self::Notification { .. } => "notification",
            Self::Broadcast { .. } => "broadcast",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_messages() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping);

        let sub: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","channel":"offers"}"#).unwrap();
        assert_eq!(sub, ClientMessage::Subscribe { channel: "offers".into() });

        let read: ClientMessage =
            serde_json::from_str(r#"{"type":"mark_read","notificationId":"abc"}"#).unwrap();
        assert_eq!(read, ClientMessage::MarkRead { notification_id: "abc".into() });

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_connection_established_shape() {
        let msg = ServerMessage::ConnectionEstablished {
            user_id: UserId::from("u1"),
            connection_id: ConnectionId::new(),
            subscriptions: vec!["general".into(), "user_u1".into()],
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "connection_established");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["subscriptions"], json!(["general", "user_u1"]));
        assert!(value.get("connectionId").is_some());
    }

    #[test]
    fn test_notification_shape() {
        let mut payload = PushPayload::new("Payout sent", "$120 is on its way");
        payload.notification_type = Some(NotificationType::PayoutProcessed);
        payload.priority = Priority::High;
        let value = serde_json::to_value(ServerMessage::notification(payload)).unwrap();
        assert_eq!(value["type"], "notification");
        assert_eq!(value["notificationType"], "payout_processed");
        assert_eq!(value["priority"], "high");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::from_app_error(&AppError::authorization("nope"));
        assert_eq!(msg, ServerMessage::error("FORBIDDEN", "nope"));
        assert_eq!(msg.kind(), "error");
    }
}
