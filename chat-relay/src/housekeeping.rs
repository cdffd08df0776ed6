//! Background housekeeping for long-running relays.
//!
//! Disconnected identities leave recharged cells behind in the keyed rate
//! limiters; this task periodically evicts them so the maps do not grow with
//! every identity ever seen.

use crate::config::HousekeepingConfig;
use crate::limits::RateLimits;
use std::time::Duration;
use tokio::time::interval;

/// Spawn the background housekeeping task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_housekeeping_task(
    rate_limits: RateLimits,
    config: HousekeepingConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Housekeeping task disabled");
            return;
        }

        let interval_secs = config.interval_secs;
        tracing::info!("Housekeeping task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            let before =
                rate_limits.connection_keys_count() + rate_limits.message_keys_count();
            rate_limits.shrink();
            let after =
                rate_limits.connection_keys_count() + rate_limits.message_keys_count();

            if before != after {
                tracing::debug!("Housekeeping: evicted {} idle limiter entries", before - after);
            }
        }
    })
}
