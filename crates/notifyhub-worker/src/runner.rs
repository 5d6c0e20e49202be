//! Delivery worker: the single consumer of the delivery queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time;

use notifyhub_core::config::delivery::DeliveryConfig;
use notifyhub_core::error::AppError;
use notifyhub_core::events::{EventBus, NotificationEvent};
use notifyhub_core::result::AppResult;
use notifyhub_core::types::NotificationId;
use notifyhub_entity::channel::ChannelPreference;
use notifyhub_entity::delivery::DeliveryResult;
use notifyhub_entity::notification::{Notification, NotificationStatus};
use notifyhub_service::NotificationService;
use notifyhub_store::{DeliveryQueue, NotificationStore, QueueEntry};

use crate::dispatcher::ChannelDispatcher;
use crate::retry::RetryPolicy;

/// Result of one delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub notification_id: NotificationId,
    /// 1 for the first attempt.
    pub attempt: u32,
    /// Status after the transition.
    pub status: NotificationStatus,
    pub results: Vec<DeliveryResult>,
    /// When the next attempt becomes due, if one was scheduled.
    pub next_attempt_at: Option<DateTime<Utc>>,
}

/// What a single [`DeliveryWorker::process_next_at`] call did.
#[derive(Debug, Clone)]
pub enum Processed {
    /// No entry was ready.
    Idle,
    /// The record is gone or already terminal; the entry was dropped.
    Skipped(NotificationId),
    /// The record is scheduled later than its queue entry; it was re-queued.
    Deferred(NotificationId),
    /// The record passed `expiresAt` and was marked expired.
    Expired(NotificationId),
    /// Channels were attempted.
    Attempted(DeliveryReport),
}

/// Drains the delivery queue one notification at a time.
///
/// Intentionally a single sequential consumer: a notification is never
/// attempted by two tasks at once and retries always follow the attempt
/// that scheduled them.
#[derive(Debug)]
pub struct DeliveryWorker {
    store: Arc<dyn NotificationStore>,
    queue: Arc<dyn DeliveryQueue>,
    events: EventBus,
    dispatcher: ChannelDispatcher,
    policy: RetryPolicy,
    config: DeliveryConfig,
}

impl DeliveryWorker {
    /// Worker sharing the service's store, queue and channels.
    pub fn new(service: &NotificationService) -> Self {
        Self {
            store: service.store().clone(),
            queue: service.queue().clone(),
            events: service.events().clone(),
            dispatcher: ChannelDispatcher::from_service(service),
            policy: RetryPolicy::from_config(&service.config().retry),
            config: service.config().clone(),
        }
    }

    /// Replace the retry policy derived from configuration.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run until the cancel signal is received.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let poll_interval = self.config.poll_interval();
        let pacing = self.config.pacing();

        tracing::info!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            pacing_ms = pacing.as_millis() as u64,
            "Delivery worker started"
        );

        loop {
            if *cancel.borrow() {
                break;
            }

            let pause = match self.process_next().await {
                Ok(Processed::Idle) => None,
                Ok(_) => Some(pacing),
                Err(e) => {
                    tracing::error!(error = %e, "Delivery worker iteration failed");
                    Some(poll_interval)
                }
            };

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!("Delivery worker received shutdown signal");
                        break;
                    }
                }
                _ = self.pause(pause, poll_interval) => {}
            }
        }

        tracing::info!("Delivery worker stopped");
    }

    async fn pause(&self, pause: Option<Duration>, poll_interval: Duration) {
        match pause {
            Some(delay) => time::sleep(delay).await,
            None => self.queue.wait_for_work(poll_interval).await,
        }
    }

    pub async fn process_next(&self) -> AppResult<Processed> {
        self.process_next_at(Utc::now()).await
    }

    /// Takes the next ready entry and applies one state transition.
    ///
    /// If a step after the dequeue fails, the entry goes back on the queue
    /// one poll interval later before the error is returned.
    pub async fn process_next_at(&self, now: DateTime<Utc>) -> AppResult<Processed> {
        let Some(entry) = self.queue.dequeue_ready(now).await? else {
            return Ok(Processed::Idle);
        };

        let outcome = self.process_entry(entry.notification_id, now).await;
        if let Err(e) = &outcome {
            self.requeue_after_failure(entry.notification_id, now, e).await;
        }
        outcome
    }

    async fn process_entry(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> AppResult<Processed> {
        let Some(notification) = self.store.get_notification(id).await? else {
            tracing::warn!(notification_id = %id, "Queued notification no longer exists");
            return Ok(Processed::Skipped(id));
        };

        if notification.status.is_terminal() {
            tracing::debug!(
                notification_id = %id,
                status = notification.status.as_str(),
                "Dropping queue entry for terminal notification"
            );
            return Ok(Processed::Skipped(id));
        }

        if notification.is_expired_at(now) {
            let notification = self.transition(id, |n| n.mark_expired(now)).await?;
            tracing::info!(notification_id = %id, "Notification expired");
            self.events.publish(NotificationEvent::NotificationExpired {
                notification_id: id,
                user_id: notification.user_id,
            });
            return Ok(Processed::Expired(id));
        }

        if let Some(at) = notification.scheduled_for.filter(|_| !notification.is_due_at(now)) {
            self.queue.enqueue(QueueEntry::new(id, at)).await?;
            return Ok(Processed::Deferred(id));
        }

        Ok(Processed::Attempted(self.attempt(notification, now).await?))
    }

    async fn requeue_after_failure(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
        error: &AppError,
    ) {
        let at = now
            + chrono::Duration::from_std(self.config.poll_interval())
                .unwrap_or_else(|_| chrono::Duration::seconds(1));
        match self.queue.enqueue(QueueEntry::new(id, at)).await {
            Ok(()) => tracing::warn!(
                notification_id = %id,
                error = %error,
                "Delivery step failed, entry re-queued"
            ),
            Err(requeue) => tracing::error!(
                notification_id = %id,
                error = %error,
                requeue_error = %requeue,
                "Delivery step failed and the entry could not be re-queued"
            ),
        }
    }

    /// Applies a delivery-state change to the stored record. Fields owned by
    /// other writers, such as `read_at`, keep their current value.
    async fn transition(
        &self,
        id: NotificationId,
        mut apply: impl FnMut(&mut Notification) + Send,
    ) -> AppResult<Notification> {
        self.store
            .modify_notification(id, &mut |stored| {
                apply(stored);
                Ok(())
            })
            .await
    }

    async fn attempt(
        &self,
        queued: Notification,
        now: DateTime<Utc>,
    ) -> AppResult<DeliveryReport> {
        let id = queued.id;
        let attempt = queued.attempt_number();

        let notification = self
            .transition(id, |n| {
                n.status = NotificationStatus::Sent;
                n.updated_at = now;
            })
            .await?;

        let results = match self.store.get_user_preferences(&notification.user_id).await {
            Ok(stored) => {
                let preferences = complete_preferences(&notification, stored);
                self.dispatcher.dispatch(&notification, &preferences).await
            }
            Err(e) => {
                tracing::warn!(
                    notification_id = %id,
                    error = %e,
                    "Could not load channel preferences"
                );
                Vec::new()
            }
        };

        let succeeded: Vec<String> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.channel.as_str().to_string())
            .collect();
        let failed: Vec<String> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.channel.as_str().to_string())
            .collect();

        let mut next_attempt_at = None;

        let notification = if !succeeded.is_empty() {
            let status = if failed.is_empty() {
                NotificationStatus::Delivered
            } else {
                NotificationStatus::PartiallyDelivered
            };
            let notification = self.transition(id, |n| n.mark_delivered(status, now)).await?;

            tracing::info!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                status = status.as_str(),
                attempt,
                "Notification delivered"
            );
            self.events.publish(NotificationEvent::NotificationDelivered {
                notification_id: notification.id,
                user_id: notification.user_id.clone(),
                status: status.as_str().to_string(),
                succeeded,
                failed,
                attempt,
            });
            notification
        } else if notification.can_retry() {
            let notification = self.transition(id, |n| n.schedule_retry(now)).await?;
            let delay = self.policy.delay_for(notification.retry_count);
            let at = now
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| {
                    chrono::Duration::seconds(self.config.retry.max_delay_seconds as i64)
                });
            self.queue.enqueue(QueueEntry::new(id, at)).await?;
            next_attempt_at = Some(at);

            tracing::warn!(
                notification_id = %notification.id,
                attempt,
                retry_count = notification.retry_count,
                max_retries = notification.max_retries,
                delay_secs = delay.as_secs(),
                "All channels failed, retry scheduled"
            );
            self.events.publish(NotificationEvent::NotificationRetryScheduled {
                notification_id: notification.id,
                user_id: notification.user_id.clone(),
                retry_count: notification.retry_count,
                next_attempt_at: at,
            });
            notification
        } else {
            let notification = self.transition(id, |n| n.mark_failed(now)).await?;

            tracing::warn!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                attempts = attempt,
                "Notification failed after exhausting retries"
            );
            self.events.publish(NotificationEvent::NotificationFailed {
                notification_id: notification.id,
                user_id: notification.user_id.clone(),
                attempts: attempt,
            });
            notification
        };

        Ok(DeliveryReport {
            notification_id: id,
            attempt,
            status: notification.status,
            results,
            next_attempt_at,
        })
    }
}

/// Stored preferences plus defaults for the requested channels the user
/// never configured.
fn complete_preferences(
    notification: &Notification,
    mut stored: Vec<ChannelPreference>,
) -> Vec<ChannelPreference> {
    for channel in &notification.channels {
        if !stored.iter().any(|p| p.channel == *channel) {
            stored.push(ChannelPreference::default_for(
                notification.user_id.clone(),
                *channel,
            ));
        }
    }
    stored
}
