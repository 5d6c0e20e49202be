//! In-memory delivery queue.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::trace;

use notifyhub_core::result::AppResult;

use crate::traits::{DeliveryQueue, QueueEntry};

/// Process-local [`DeliveryQueue`] with FIFO admission order.
#[derive(Debug, Default)]
pub struct MemoryDeliveryQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    wake: Notify,
}

impl MemoryDeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryQueue for MemoryDeliveryQueue {
    async fn enqueue(&self, entry: QueueEntry) -> AppResult<()> {
        self.entries.lock().await.push_back(entry);
        trace!(notification_id = %entry.notification_id, available_at = %entry.available_at, "Queued");
        self.wake.notify_one();
        Ok(())
    }

    async fn dequeue_ready(&self, now: DateTime<Utc>) -> AppResult<Option<QueueEntry>> {
        let mut entries = self.entries.lock().await;
        let position = entries.iter().position(|e| e.available_at <= now);
        Ok(position.and_then(|index| entries.remove(index)))
    }

    async fn len(&self) -> AppResult<usize> {
        Ok(self.entries.lock().await.len())
    }

    async fn wait_for_work(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.wake.notified()).await;
    }
}
