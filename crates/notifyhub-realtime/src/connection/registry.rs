//! Connection registry — owns every live connection and its topics.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use notifyhub_core::config::realtime::RealtimeConfig;
use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;
use notifyhub_core::types::{ConnectionId, NotificationId, UserId};

use crate::message::types::{ClientMessage, ServerMessage};
use crate::message::validator::{validate_inbound, validate_topic_name};
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::topic::{GENERAL_TOPIC, TopicRegistry};

use super::handle::{ConnectionHandle, ConnectionInfo, close_code};
use super::pool::ConnectionPool;

/// Follow-up work an inbound message asks of the layers above the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    /// The client asked to mark a notification as read.
    MarkRead {
        user_id: UserId,
        notification_id: NotificationId,
    },
}

/// Single owner of the live connection map and subscription sets.
///
/// Callers address connections by [`ConnectionId`] only; handles never
/// leave the registry except to the transport task that owns the socket.
#[derive(Debug)]
pub struct ConnectionRegistry {
    pool: ConnectionPool,
    topics: TopicRegistry,
    metrics: RealtimeMetrics,
    config: RealtimeConfig,
}

impl ConnectionRegistry {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            pool: ConnectionPool::new(),
            topics: TopicRegistry::new(),
            metrics: RealtimeMetrics::new(),
            config,
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Evicts the user's least recently active connection when the per-user
    /// cap is reached, subscribes the new connection to `general` and the
    /// user's private topic, and queues `connection_established`. Returns
    /// the handle and the receiver the transport task drains.
    pub fn register(
        &self,
        user_id: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(user_id.clone(), tx));

        let evicted = self
            .pool
            .admit(handle.clone(), self.config.max_connections_per_user);
        for old in evicted {
            warn!(
                conn_id = %old.id,
                user_id = %user_id,
                max = self.config.max_connections_per_user,
                "Connection limit reached, evicting least recently active connection"
            );
            old.close(close_code::POLICY_VIOLATION, "Connection limit exceeded");
            self.topics.unsubscribe_all(old.id);
            self.metrics.connection_evicted();
        }

        self.topics.subscribe(GENERAL_TOPIC, handle.id);
        self.topics.subscribe(&user_id.private_topic(), handle.id);
        self.metrics.connection_opened();

        let established = ServerMessage::ConnectionEstablished {
            user_id: user_id.clone(),
            connection_id: handle.id,
            subscriptions: self.topics.topics_of(handle.id),
            timestamp: Utc::now(),
        };
        self.push(&handle, established);

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            "Real-time connection registered"
        );

        (handle, rx)
    }

    /// Removes a connection whose transport closed or errored.
    pub fn unregister(&self, conn_id: &ConnectionId) -> bool {
        match self.pool.remove(conn_id) {
            Some(handle) => {
                handle.mark_dead();
                self.topics.unsubscribe_all(*conn_id);
                info!(
                    conn_id = %conn_id,
                    user_id = %handle.user_id,
                    "Real-time connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Joins a topic. Returns `false` if the connection was already in it.
    pub fn subscribe(&self, conn_id: &ConnectionId, topic: &str) -> AppResult<bool> {
        validate_topic_name(topic)?;
        let handle = self.require(conn_id)?;

        if topic.starts_with("user_") && topic != handle.user_id.private_topic() {
            return Err(AppError::authorization(format!(
                "Not authorized to subscribe to channel: {topic}"
            )));
        }
        if self.topics.is_subscribed(topic, handle.id) {
            return Ok(false);
        }

        let max = self.config.max_subscriptions_per_connection;
        if self.topics.subscription_count(handle.id) >= max {
            return Err(AppError::validation(format!(
                "Maximum subscriptions ({max}) reached"
            )));
        }

        let added = self.topics.subscribe(topic, handle.id);
        debug!(conn_id = %conn_id, topic = %topic, "Subscribed to topic");
        Ok(added)
    }

    /// Leaves a topic. Returns `false` if the connection was not in it.
    pub fn unsubscribe(&self, conn_id: &ConnectionId, topic: &str) -> AppResult<bool> {
        let handle = self.require(conn_id)?;
        if topic == handle.user_id.private_topic() {
            return Err(AppError::validation(
                "The private user channel cannot be unsubscribed",
            ));
        }

        let removed = self.topics.unsubscribe(topic, handle.id);
        debug!(conn_id = %conn_id, topic = %topic, "Unsubscribed from topic");
        Ok(removed)
    }

    /// Best-effort push to one connection. No-op if it is not open.
    pub fn send(&self, conn_id: &ConnectionId, msg: ServerMessage) -> bool {
        match self.pool.get(conn_id) {
            Some(handle) => self.push(&handle, msg),
            None => false,
        }
    }

    /// Best-effort push to every open connection of a user.
    ///
    /// Returns the number of connections that accepted the message.
    pub fn send_to_user(&self, user_id: &UserId, msg: ServerMessage) -> usize {
        self.pool
            .get_user_connections(user_id)
            .iter()
            .filter(|handle| self.push(handle, msg.clone()))
            .count()
    }

    /// Pushes to every connection subscribed to `topic`.
    ///
    /// Returns the number of connections that accepted the message.
    pub fn broadcast_topic(&self, topic: &str, msg: ServerMessage) -> usize {
        let reached = self
            .topics
            .subscribers(topic)
            .iter()
            .filter_map(|conn_id| self.pool.get(conn_id))
            .filter(|handle| self.push(handle, msg.clone()))
            .count();
        debug!(topic = %topic, reached, "Broadcast to topic");
        reached
    }

    /// Records inbound activity on a connection.
    pub fn touch(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.pool.get(conn_id) {
            handle.touch();
        }
    }

    /// Closes and removes connections idle for longer than `max_idle`.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        self.sweep_idle_at(Utc::now(), max_idle)
    }

    /// [`sweep_idle`](Self::sweep_idle) evaluated at `now`.
    pub fn sweep_idle_at(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let max_idle_ms = i64::try_from(max_idle.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.timestamp_millis().saturating_sub(max_idle_ms);

        let idle: Vec<Arc<ConnectionHandle>> = self
            .pool
            .all_connections()
            .into_iter()
            .filter(|handle| handle.last_activity_millis() < cutoff)
            .collect();

        for handle in &idle {
            info!(
                conn_id = %handle.id,
                user_id = %handle.user_id,
                last_activity = %handle.last_activity(),
                "Closing idle connection"
            );
            handle.close(close_code::NORMAL, "Connection timeout");
            self.unregister(&handle.id);
        }

        self.metrics.connections_reclaimed(idle.len());
        idle.len()
    }

    /// Processes one inbound text frame.
    ///
    /// Protocol replies (pong, acks, errors) are pushed directly; anything
    /// that needs the notification service is returned as an
    /// [`InboundAction`].
    pub fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) -> Option<InboundAction> {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return None;
        };

        handle.touch();
        self.metrics.message_received();

        if let Err(e) = validate_inbound(raw, self.config.max_message_size) {
            self.push(&handle, ServerMessage::from_app_error(&e));
            return None;
        }

        let msg: ClientMessage = match serde_json::from_str(raw) {
            Ok(msg) => msg,
            Err(e) => {
                self.push(
                    &handle,
                    ServerMessage::error("INVALID_MESSAGE", format!("Failed to parse message: {e}")),
                );
                return None;
            }
        };

        match msg {
            ClientMessage::Ping => {
                self.push(&handle, ServerMessage::Pong { timestamp: Utc::now() });
                None
            }
            ClientMessage::Subscribe { channel } => {
                let reply = match self.subscribe(conn_id, &channel) {
                    Ok(_) => ServerMessage::Subscribed {
                        channel,
                        timestamp: Utc::now(),
                    },
                    Err(e) => ServerMessage::from_app_error(&e),
                };
                self.push(&handle, reply);
                None
            }
            ClientMessage::Unsubscribe { channel } => {
                let reply = match self.unsubscribe(conn_id, &channel) {
                    Ok(_) => ServerMessage::Unsubscribed {
                        channel,
                        timestamp: Utc::now(),
                    },
                    Err(e) => ServerMessage::from_app_error(&e),
                };
                self.push(&handle, reply);
                None
            }
            ClientMessage::MarkRead { notification_id } => match notification_id.parse() {
                Ok(notification_id) => Some(InboundAction::MarkRead {
                    user_id: handle.user_id.clone(),
                    notification_id,
                }),
                Err(_) => {
                    self.push(
                        &handle,
                        ServerMessage::error(
                            "INVALID_REQUEST",
                            format!("Invalid notification id '{notification_id}'"),
                        ),
                    );
                    None
                }
            },
        }
    }

    /// Closes every connection, e.g. on shutdown.
    pub fn close_all(&self, code: u16, reason: &str) -> usize {
        let all = self.pool.all_connections();
        for handle in &all {
            handle.close(code, reason);
            self.unregister(&handle.id);
        }
        all.len()
    }

    /// Sorted topics of a connection.
    pub fn subscriptions(&self, conn_id: &ConnectionId) -> Vec<String> {
        self.topics.topics_of(*conn_id)
    }

    pub fn is_registered(&self, conn_id: &ConnectionId) -> bool {
        self.pool.get(conn_id).is_some()
    }

    pub fn connection_info(&self, conn_id: &ConnectionId) -> Option<ConnectionInfo> {
        self.pool
            .get(conn_id)
            .map(|handle| handle.info(self.topics.topics_of(*conn_id)))
    }

    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.pool.get_user_connections(user_id).len()
    }

    pub fn connected_users(&self) -> usize {
        self.pool.user_count()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    fn require(&self, conn_id: &ConnectionId) -> AppResult<Arc<ConnectionHandle>> {
        self.pool
            .get(conn_id)
            .ok_or_else(|| AppError::not_found(format!("Connection {conn_id} not found")))
    }

    fn push(&self, handle: &ConnectionHandle, msg: ServerMessage) -> bool {
        let delivered = handle.send(msg);
        self.metrics.message_pushed(delivered);
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(RealtimeConfig::default())
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_register_sends_established_with_default_topics() {
        let registry = registry();
        let (handle, mut rx) = registry.register(UserId::from("42"));

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ServerMessage::ConnectionEstablished {
                user_id,
                connection_id,
                subscriptions,
                ..
            } => {
                assert_eq!(user_id.as_str(), "42");
                assert_eq!(*connection_id, handle.id);
                assert_eq!(subscriptions, &vec!["general".to_string(), "user_42".to_string()]);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_sixth_connection_evicts_least_recently_active() {
        let registry = registry();
        let user = UserId::from("u1");
        let base = Utc::now();
        let mut handles = Vec::new();
        for i in 0..5 {
            let (handle, rx) = registry.register(user.clone());
            handle.touch_at(base - ChronoDuration::minutes(10 - i));
            handles.push((handle, rx));
        }
        // Make the third connection the least recently active one.
        handles[2].0.touch_at(base - ChronoDuration::hours(1));

        let (newest, _rx) = registry.register(user.clone());

        assert_eq!(registry.user_connection_count(&user), 5);
        assert_eq!(registry.connection_count(), 5);
        assert!(registry.is_registered(&newest.id));

        let evicted = &handles[2].0;
        assert!(!registry.is_registered(&evicted.id));
        assert!(!evicted.is_alive());
        let frame = evicted.close_frame().expect("evicted connection is closed");
        assert_eq!(frame.code, close_code::POLICY_VIOLATION);
        assert!(registry.subscriptions(&evicted.id).is_empty());

        let survivors = handles
            .iter()
            .filter(|(h, _)| registry.is_registered(&h.id))
            .count();
        assert_eq!(survivors, 4);
        assert_eq!(registry.metrics().evictions, 1);
    }

    #[test]
    fn test_sweep_idle_removes_only_stale_connections() {
        let registry = registry();
        let now = Utc::now();
        let (stale_a, _a) = registry.register(UserId::from("u1"));
        let (fresh, _b) = registry.register(UserId::from("u1"));
        let (stale_b, _c) = registry.register(UserId::from("u2"));
        stale_a.touch_at(now - ChronoDuration::minutes(31));
        stale_b.touch_at(now - ChronoDuration::hours(3));
        fresh.touch_at(now - ChronoDuration::minutes(29));

        let removed = registry.sweep_idle_at(now, Duration::from_secs(30 * 60));

        assert_eq!(removed, 2);
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.is_registered(&fresh.id));
        assert_eq!(stale_a.close_frame().unwrap().code, close_code::NORMAL);
        assert_eq!(stale_b.close_frame().unwrap().reason, "Connection timeout");
        assert!(fresh.close_frame().is_none());
        assert_eq!(registry.metrics().idle_reclaimed, 2);
    }

    #[test]
    fn test_broadcast_skips_unsubscribed_connections() {
        let registry = registry();
        let (a, mut rx_a) = registry.register(UserId::from("a"));
        let (b, mut rx_b) = registry.register(UserId::from("b"));
        let (_c, mut rx_c) = registry.register(UserId::from("c"));
        assert!(registry.unsubscribe(&b.id, GENERAL_TOPIC).unwrap());
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        let reached = registry.broadcast_topic(
            GENERAL_TOPIC,
            ServerMessage::broadcast(GENERAL_TOPIC, crate::message::PushPayload::new("Hi", "all")),
        );

        assert_eq!(reached, 2);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(drain(&mut rx_c).len(), 1);
        assert!(registry.subscriptions(&a.id).contains(&"general".to_string()));
    }

    #[test]
    fn test_subscribe_rules() {
        let registry = registry();
        let (handle, _rx) = registry.register(UserId::from("u1"));

        assert!(registry.subscribe(&handle.id, "offers").unwrap());
        assert!(!registry.subscribe(&handle.id, "offers").unwrap());
        assert!(!registry.subscribe(&handle.id, "user_u1").unwrap());
        assert!(registry.subscribe(&handle.id, "user_u2").is_err());
        assert!(registry.subscribe(&handle.id, "bad topic").is_err());
        assert!(registry.unsubscribe(&handle.id, "user_u1").is_err());
        assert!(registry.unsubscribe(&handle.id, "offers").unwrap());
        assert!(!registry.unsubscribe(&handle.id, "offers").unwrap());
        assert!(registry.subscribe(&ConnectionId::new(), "offers").is_err());
    }

    #[test]
    fn test_subscription_cap() {
        let config = RealtimeConfig {
            max_subscriptions_per_connection: 3,
            ..RealtimeConfig::default()
        };
        let registry = ConnectionRegistry::new(config);
        let (handle, _rx) = registry.register(UserId::from("u1"));
        assert!(registry.subscribe(&handle.id, "one").unwrap());
        let err = registry.subscribe(&handle.id, "two").unwrap_err();
        assert!(err.message.contains("Maximum subscriptions"));
    }

    #[test]
    fn test_send_to_unknown_or_closed_connection_is_noop() {
        let registry = registry();
        let pong = ServerMessage::Pong { timestamp: Utc::now() };
        assert!(!registry.send(&ConnectionId::new(), pong.clone()));

        let (handle, rx) = registry.register(UserId::from("u1"));
        drop(rx);
        assert!(!registry.send(&handle.id, pong));
        assert_eq!(registry.send_to_user(&UserId::from("u1"), ServerMessage::error("X", "y")), 0);
    }

    #[test]
    fn test_handle_inbound_protocol() {
        let registry = registry();
        let (handle, mut rx) = registry.register(UserId::from("u1"));
        drain(&mut rx);
        handle.touch_at(Utc::now() - ChronoDuration::hours(1));

        assert!(registry.handle_inbound(&handle.id, r#"{"type":"ping"}"#).is_none());
        assert!(handle.last_activity() > Utc::now() - ChronoDuration::minutes(1));
        assert_eq!(drain(&mut rx)[0].kind(), "pong");

        registry.handle_inbound(&handle.id, r#"{"type":"subscribe","channel":"offers"}"#);
        assert_eq!(drain(&mut rx)[0].kind(), "subscribed");

        registry.handle_inbound(&handle.id, r#"{"type":"unsubscribe","channel":"offers"}"#);
        assert_eq!(drain(&mut rx)[0].kind(), "unsubscribed");

        registry.handle_inbound(&handle.id, "not json");
        match &drain(&mut rx)[0] {
            ServerMessage::Error { code, .. } => assert_eq!(code, "INVALID_MESSAGE"),
            other => panic!("unexpected message {other:?}"),
        }

        let id = NotificationId::new();
        let action = registry.handle_inbound(
            &handle.id,
            &format!(r#"{{"type":"mark_read","notificationId":"{id}"}}"#),
        );
        assert_eq!(
            action,
            Some(InboundAction::MarkRead {
                user_id: UserId::from("u1"),
                notification_id: id,
            })
        );

        let action =
            registry.handle_inbound(&handle.id, r#"{"type":"mark_read","notificationId":"x"}"#);
        assert!(action.is_none());
        assert_eq!(drain(&mut rx)[0].kind(), "error");
    }

    #[test]
    fn test_close_all() {
        let registry = registry();
        let (a, _ra) = registry.register(UserId::from("u1"));
        let (_b, _rb) = registry.register(UserId::from("u2"));
        assert_eq!(registry.close_all(close_code::GOING_AWAY, "Server shutting down"), 2);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(a.close_frame().unwrap().code, 1001);
    }
}
