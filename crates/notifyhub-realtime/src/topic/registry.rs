//! Topic registry — topic name to subscribed connections.

use std::collections::HashSet;

use dashmap::DashMap;

use notifyhub_core::types::ConnectionId;

use super::subscription::SubscriptionTracker;

/// All live topics and their subscribers. Empty topics are dropped.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: DashMap<String, HashSet<ConnectionId>>,
    subscriptions: SubscriptionTracker,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection. Returns `false` if it was already subscribed.
    pub fn subscribe(&self, topic: &str, conn_id: ConnectionId) -> bool {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(conn_id);
        self.subscriptions.add(conn_id, topic)
    }

    /// Unsubscribes a connection. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, topic: &str, conn_id: ConnectionId) -> bool {
        if let Some(mut subscribers) = self.topics.get_mut(topic) {
            subscribers.remove(&conn_id);
        }
        self.topics.remove_if(topic, |_, subscribers| subscribers.is_empty());
        self.subscriptions.remove(conn_id, topic)
    }

    /// Unsubscribes a connection from every topic.
    pub fn unsubscribe_all(&self, conn_id: ConnectionId) {
        for topic in self.subscriptions.remove_all(conn_id) {
            if let Some(mut subscribers) = self.topics.get_mut(&topic) {
                subscribers.remove(&conn_id);
            }
            self.topics
                .remove_if(&topic, |_, subscribers| subscribers.is_empty());
        }
    }

    pub fn is_subscribed(&self, topic: &str, conn_id: ConnectionId) -> bool {
        self.subscriptions.contains(conn_id, topic)
    }

    /// Connection IDs subscribed to a topic.
    pub fn subscribers(&self, topic: &str) -> Vec<ConnectionId> {
        self.topics
            .get(topic)
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sorted topics of a connection.
    pub fn topics_of(&self, conn_id: ConnectionId) -> Vec<String> {
        self.subscriptions.topics(conn_id)
    }

    pub fn subscription_count(&self, conn_id: ConnectionId) -> usize {
        self.subscriptions.count(conn_id)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_idempotent() {
        let registry = TopicRegistry::new();
        let conn = ConnectionId::new();
        assert!(registry.subscribe("general", conn));
        assert!(!registry.subscribe("general", conn));
        assert_eq!(registry.subscribers("general"), vec![conn]);
        assert_eq!(registry.subscription_count(conn), 1);
    }

    #[test]
    fn test_empty_topics_are_dropped() {
        let registry = TopicRegistry::new();
        let conn = ConnectionId::new();
        registry.subscribe("offers", conn);
        assert_eq!(registry.topic_count(), 1);
        assert!(registry.unsubscribe("offers", conn));
        assert!(!registry.unsubscribe("offers", conn));
        assert_eq!(registry.topic_count(), 0);
    }

    #[test]
    fn test_unsubscribe_all() {
        let registry = TopicRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        registry.subscribe("general", a);
        registry.subscribe("user_1", a);
        registry.subscribe("general", b);

        registry.unsubscribe_all(a);

        assert_eq!(registry.subscribers("general"), vec![b]);
        assert!(registry.subscribers("user_1").is_empty());
        assert!(registry.topics_of(a).is_empty());
        assert_eq!(registry.topics_of(b), vec!["general".to_string()]);
    }
}
