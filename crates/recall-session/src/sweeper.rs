//! Periodic expiry sweep run on the caller's Tokio runtime.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::cache::ContextCache;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Background task calling [`ContextCache::sweep_expired`] on an interval.
///
/// One task per sweeper, so sweeps never overlap each other; each sweep
/// takes the cache lock like any foreground call.
pub struct ExpirySweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Spawn the sweep loop on the current runtime.
    ///
    /// The first sweep runs one full `interval` after spawning.
    pub fn spawn(cache: ContextCache, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            debug!(interval_ms = interval.as_millis() as u64, "Expiry sweeper started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep_expired();
                        trace!(removed, "Expiry sweep tick");
                    }
                }
            }
            debug!("Expiry sweeper stopped");
        });

        Self { cancel, handle }
    }

    /// Whether the sweep loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!(error = %e, "Expiry sweeper task failed");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
