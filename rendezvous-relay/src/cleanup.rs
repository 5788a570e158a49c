//! Background sweep for expired and finished sessions.
//!
//! Runs periodically to expire sessions past their TTL and to reap sessions
//! that have been terminal for longer than the retention window.

use crate::config::CleanupConfig;
use crate::manager::SessionManager;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawn the background sweep task.
///
/// The task stops when `shutdown` is cancelled. Returns a handle that can be
/// awaited or aborted.
pub fn spawn_sweep_task(
    manager: Arc<SessionManager>,
    config: CleanupConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Sweep task disabled");
            return;
        }

        let retention = config.retention();
        tracing::info!(
            "Sweep task started (interval: {}ms, retention: {}s)",
            config.interval_ms,
            config.retention_secs
        );

        let mut timer = interval(config.interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Sweep task stopped");
                    return;
                }
                _ = timer.tick() => {}
            }

            let expired = manager.expire_due();
            let reaped = manager.reap_terminal(retention);
            if expired > 0 || reaped > 0 {
                tracing::info!("Sweep: expired {} sessions, reaped {}", expired, reaped);
            } else {
                tracing::trace!("Sweep: nothing to do");
            }
        }
    })
}
