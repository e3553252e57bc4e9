//! Replication Rotation Task
//!
//! Rotates the replication log generations on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::replication::ReplicationLog;

/// Spawns the task that calls [`ReplicationLog::rotate`] every `period`.
pub fn spawn_rotation_task(
    replication: Arc<ReplicationLog>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_ms = period.as_millis() as u64, "Starting replication rotation task");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Replication rotation task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    replication.rotate().await;
                }
            }
        }
    })
}
