//! Delivery queue abstraction.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifyhub_core::result::AppResult;
use notifyhub_core::types::NotificationId;
use serde::{Deserialize, Serialize};

/// A reference to a notification waiting for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub notification_id: NotificationId,
    /// Not handed out before this instant.
    pub available_at: DateTime<Utc>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Entry available from `available_at`, enqueued at the same instant
    /// unless it lies in the future.
    pub fn new(notification_id: NotificationId, available_at: DateTime<Utc>) -> Self {
        Self {
            notification_id,
            available_at,
            enqueued_at: available_at.min(Utc::now()),
        }
    }
}

/// FIFO of pending deliveries.
///
/// Built for one consumer. Running several workers against the same queue
/// needs a claim/lease per entry (for instance `claimed_by` and
/// `claimed_until` columns checked with an optimistic update) so that two
/// workers never deliver the same notification concurrently.
#[async_trait]
pub trait DeliveryQueue: Send + Sync + std::fmt::Debug {
    /// Append an entry.
    async fn enqueue(&self, entry: QueueEntry) -> AppResult<()>;

    /// Remove and return the oldest entry whose `available_at <= now`.
    ///
    /// Entries that are not yet due are skipped and keep their position.
    async fn dequeue_ready(&self, now: DateTime<Utc>) -> AppResult<Option<QueueEntry>>;

    /// Number of entries, due or not.
    async fn len(&self) -> AppResult<usize>;

    async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Suspend until new work may be available or `timeout` elapses.
    async fn wait_for_work(&self, timeout: Duration) {
        tokio::time::sleep(timeout).await;
    }
}
