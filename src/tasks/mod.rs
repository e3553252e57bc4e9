//! Background Tasks Module
//!
//! Long-lived tasks that run for the lifetime of the server.
//!
//! # Tasks
//! - Expiration tick: emits keys whose rounded expiry tick has arrived
//! - Eviction: deletes emitted keys from the store
//! - Replication rotation: shifts replication log generations

mod eviction;
mod expiration;
mod rotation;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::AppState;
use crate::scheduler::ExpiredKeys;

pub use eviction::spawn_eviction_task;
pub use expiration::spawn_expiration_task;
pub use rotation::spawn_rotation_task;

/// Handles to the running background tasks.
pub struct BackgroundTasks {
    cancel: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Returns the token shared by all tasks.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals every task to stop and waits for all of them to finish.
    ///
    /// Each task completes its current iteration before it stops.
    pub async fn shutdown(self) {
        self.cancel.cancel();

        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Background task ended abnormally");
            }
        }
        info!("Background tasks stopped");
    }
}

/// Spawns the expiration, eviction and rotation tasks for `state`.
///
/// `expired` is the receiver returned by [`AppState::from_config`].
pub fn spawn_background_tasks(state: &AppState, expired: ExpiredKeys) -> BackgroundTasks {
    let cancel = CancellationToken::new();

    let handles = vec![
        (
            "expiration",
            spawn_expiration_task(state.scheduler.clone(), cancel.clone()),
        ),
        (
            "eviction",
            spawn_eviction_task(state.cache.clone(), expired, cancel.clone()),
        ),
        (
            "rotation",
            spawn_rotation_task(
                state.replication.clone(),
                state.rotate_interval,
                cancel.clone(),
            ),
        ),
    ];

    BackgroundTasks { cancel, handles }
}
