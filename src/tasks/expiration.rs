//! Expiration Tick Task
//!
//! Drives the expiration scheduler at its tick cadence.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::scheduler::ExpirationScheduler;

/// Spawns the task that ticks the scheduler every `tick_interval()`.
///
/// The first tick fires one interval after start. A tick that is blocked on a
/// full expired-key queue finishes (or fails) before cancellation is seen.
pub fn spawn_expiration_task(
    scheduler: Arc<ExpirationScheduler>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let period = scheduler.tick_interval();

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs(), "Starting expiration tick task");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Expiration tick task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    scheduler.tick().await;
                }
            }
        }
    })
}
