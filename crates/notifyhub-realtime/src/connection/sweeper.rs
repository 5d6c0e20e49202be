//! Periodic idle-connection sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::registry::ConnectionRegistry;

/// Runs [`ConnectionRegistry::sweep_idle`] every `interval` until
/// `shutdown` flips to `true` or its sender is dropped.
pub async fn run_idle_sweeper(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    max_idle: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    info!(
        interval_secs = interval.as_secs(),
        max_idle_secs = max_idle.as_secs(),
        "Idle connection sweeper started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = registry.sweep_idle(max_idle);
                if removed > 0 {
                    info!(removed, remaining = registry.connection_count(), "Idle connections reclaimed");
                } else {
                    debug!("Idle sweep found nothing to reclaim");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Idle connection sweeper stopped");
}
