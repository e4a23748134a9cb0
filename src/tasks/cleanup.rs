//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries. Lookups
//! still purge lazily; the sweep only bounds how long dead entries occupy slots.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{lock, SharedCache};

/// Spawns a background task that purges expired entries every
/// `cleanup_interval_secs` seconds.
///
/// Returns the task handle so it can be aborted during graceful shutdown.
pub fn spawn_cleanup_task<V>(cache: SharedCache<V>, cleanup_interval_secs: u64) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache expiry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = lock(&cache).purge_expired();

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
