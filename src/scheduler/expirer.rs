//! Expiration Scheduler Module
//!
//! Batches expiry checks onto a fixed tick cadence instead of keeping one
//! timer per record.

use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::cache::{current_unix_secs, KeyInfo};
use crate::scheduler::ScheduleHeap;

// == Expired Key ==
/// A key whose expiration tick has arrived.
///
/// `threshold` is the rounded tick the key was scheduled for. The store only
/// deletes the entry if its current expiry is at or before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredKey {
    pub key: String,
    pub threshold: i64,
}

/// Receiving half of the scheduler's bounded output queue.
pub type ExpiredKeys = mpsc::Receiver<ExpiredKey>;

// == Rounding ==
/// Rounds `expires` up to the first tick boundary strictly after it.
///
/// `floor(expires / tick_secs + 1) * tick_secs`, so an exact multiple moves to
/// the following boundary. Saturates instead of overflowing.
pub fn round_to_next_tick(expires: i64, tick_secs: i64) -> i64 {
    expires
        .div_euclid(tick_secs)
        .saturating_add(1)
        .saturating_mul(tick_secs)
}

// == Expiration Scheduler ==
/// Min-priority queue of keys by rounded expiry tick.
///
/// Each [`tick_at`](Self::tick_at) pushes every due key onto a bounded output
/// queue. When that queue is full the tick waits for room, so a slow consumer
/// stalls further expiry delivery.
#[derive(Debug)]
pub struct ExpirationScheduler {
    tick_secs: i64,
    heap: Mutex<ScheduleHeap>,
    expired_tx: mpsc::Sender<ExpiredKey>,
}

impl ExpirationScheduler {
    // == Constructor ==
    /// Creates a scheduler ticking every `tick_secs` seconds and its output
    /// queue holding at most `queue_size` expired keys.
    ///
    /// # Panics
    /// Panics if `tick_secs` is not positive or `queue_size` is zero. Both are
    /// rejected earlier by config validation.
    pub fn new(tick_secs: i64, queue_size: usize) -> (Self, ExpiredKeys) {
        assert!(tick_secs > 0, "scheduler tick must be positive");
        let (expired_tx, expired_rx) = mpsc::channel(queue_size);

        let scheduler = Self {
            tick_secs,
            heap: Mutex::new(ScheduleHeap::new()),
            expired_tx,
        };
        (scheduler, expired_rx)
    }

    // == Add ==
    /// Schedules `key` for the tick boundary following its expiry.
    pub async fn add(&self, key: &KeyInfo) {
        let tick = round_to_next_tick(key.expires, self.tick_secs);

        let mut heap = self.heap.lock().await;
        heap.push(key.key.clone(), tick);
    }

    // == Tick ==
    /// Runs one tick against the wall clock.
    pub async fn tick(&self) -> usize {
        self.tick_at(current_unix_secs()).await
    }

    /// Delivers every key due at `now` to the output queue.
    ///
    /// Due entries are popped under the heap lock and sent after it is
    /// released. Returns the number of keys delivered; if the receiver is
    /// gone the remaining keys of this tick are dropped.
    pub async fn tick_at(&self, now: i64) -> usize {
        let due = {
            let mut heap = self.heap.lock().await;
            heap.pop_due(now)
        };

        if due.is_empty() {
            debug!(now, "Expiration tick: nothing due");
            return 0;
        }

        let total = due.len();
        let mut delivered = 0;
        for item in due {
            let expired = ExpiredKey {
                key: item.key,
                threshold: item.tick,
            };
            if self.expired_tx.send(expired).await.is_err() {
                warn!(
                    dropped = total - delivered,
                    "Expired key queue closed, dropping due keys"
                );
                break;
            }
            delivered += 1;
        }

        debug!(now, delivered, "Expiration tick delivered due keys");
        delivered
    }

    // == Pending ==
    /// Returns the number of keys still waiting for their tick.
    pub async fn pending(&self) -> usize {
        self.heap.lock().await.len()
    }

    // == Tick Interval ==
    /// Returns the tick cadence.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs.unsigned_abs())
    }
}
