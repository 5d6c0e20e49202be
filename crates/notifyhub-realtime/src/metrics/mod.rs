//! Realtime metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters maintained by the connection registry.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_total: AtomicU64,
    messages_sent: AtomicU64,
    messages_dropped: AtomicU64,
    messages_received: AtomicU64,
    evictions: AtomicU64,
    idle_reclaimed: AtomicU64,
}

impl RealtimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one push.
    pub fn message_pushed(&self, delivered: bool) {
        let counter = if delivered {
            &self.messages_sent
        } else {
            &self.messages_dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_evicted(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connections_reclaimed(&self, count: usize) {
        self.idle_reclaimed.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            idle_reclaimed: self.idle_reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Connections ever registered.
    pub connections_total: u64,
    pub messages_sent: u64,
    /// Pushes dropped on a full buffer or a closed transport.
    pub messages_dropped: u64,
    pub messages_received: u64,
    /// Connections closed for exceeding the per-user cap.
    pub evictions: u64,
    /// Connections closed by the idle sweep.
    pub idle_reclaimed: u64,
}
