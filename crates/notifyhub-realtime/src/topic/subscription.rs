//! Subscription tracking — which topics each connection belongs to.

use std::collections::BTreeSet;

use dashmap::DashMap;

use notifyhub_core::types::ConnectionId;

/// Connection-to-topic mapping (reverse index of [`super::TopicRegistry`]).
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    conn_to_topics: DashMap<ConnectionId, BTreeSet<String>>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a subscription. Returns `false` if it already existed.
    pub fn add(&self, conn_id: ConnectionId, topic: &str) -> bool {
        self.conn_to_topics
            .entry(conn_id)
            .or_default()
            .insert(topic.to_string())
    }

    /// Removes a subscription. Returns `false` if there was none.
    pub fn remove(&self, conn_id: ConnectionId, topic: &str) -> bool {
        self.conn_to_topics
            .get_mut(&conn_id)
            .map(|mut topics| topics.remove(topic))
            .unwrap_or(false)
    }

    pub fn contains(&self, conn_id: ConnectionId, topic: &str) -> bool {
        self.conn_to_topics
            .get(&conn_id)
            .is_some_and(|topics| topics.contains(topic))
    }

    /// Topics of a connection in sorted order.
    pub fn topics(&self, conn_id: ConnectionId) -> Vec<String> {
        self.conn_to_topics
            .get(&conn_id)
            .map(|entry| entry.value().iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, conn_id: ConnectionId) -> usize {
        self.conn_to_topics
            .get(&conn_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Forgets a connection, returning the topics it was in.
    pub fn remove_all(&self, conn_id: ConnectionId) -> BTreeSet<String> {
        self.conn_to_topics
            .remove(&conn_id)
            .map(|(_, topics)| topics)
            .unwrap_or_default()
    }
}
