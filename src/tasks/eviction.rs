//! Eviction Task
//!
//! Consumes the scheduler's expired-key queue and deletes each key from the
//! store, subject to the store's overwrite guard.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::ExpiringStore;
use crate::scheduler::ExpiredKeys;

/// Spawns the task that evicts keys emitted by the expiration scheduler.
///
/// The task owns the receiver. When it exits the receiver is dropped, which
/// releases a scheduler tick blocked on a full queue.
pub fn spawn_eviction_task(
    cache: Arc<ExpiringStore>,
    mut expired: ExpiredKeys,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting eviction task");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Eviction task shutting down");
                    break;
                }
                next = expired.recv() => {
                    let Some(expired_key) = next else {
                        info!("Expired key queue closed, eviction task exiting");
                        break;
                    };

                    let removed = cache
                        .delete(&expired_key.key, expired_key.threshold)
                        .await
                        .is_some();
                    debug!(
                        key = %expired_key.key,
                        threshold = expired_key.threshold,
                        removed,
                        "Processed expired key"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RecordIdAllocator;
    use crate::scheduler::ExpiredKey;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_eviction_task_applies_threshold() {
        let ids = RecordIdAllocator::new();
        let cache = Arc::new(ExpiringStore::new());
        cache.insert("expired".to_string(), ids.new_record(100, "a")).await;
        cache.insert("renewed".to_string(), ids.new_record(500, "b")).await;

        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = spawn_eviction_task(cache.clone(), rx, cancel.clone());

        for key in ["expired", "renewed"] {
            tx.send(ExpiredKey {
                key: key.to_string(),
                threshold: 120,
            })
            .await
            .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.lookup("expired", 0).await.is_none());
        assert!(cache.lookup("renewed", 0).await.is_some());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_eviction_task_exits_when_queue_closes() {
        let cache = Arc::new(ExpiringStore::new());
        let (tx, rx) = mpsc::channel::<ExpiredKey>(1);
        let handle = spawn_eviction_task(cache, rx, CancellationToken::new());

        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should exit")
            .unwrap();
    }
}
