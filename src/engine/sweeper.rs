//! Periodic expiry sweep.

use super::SecretEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run [`SecretEngine::sweep_expired`] every `interval` until `shutdown` is
/// cancelled. A failed sweep is logged and retried on the next tick.
pub fn spawn_sweeper(
    engine: Arc<SecretEngine>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_seconds = interval.as_secs(), "Expiry sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = engine.sweep_expired().await {
                        error!(error = %e, retryable = e.is_retryable(), "Expiry sweep failed");
                    }
                }
            }
        }
    })
}
