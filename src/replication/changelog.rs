//! Change Log Module
//!
//! Bounded ingestion queue plus three rotating generations (Old, Current,
//! Next) of mutation records.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{current_unix_secs, RecordIdAllocator};
use crate::replication::{ReplItem, ReplLog};

/// Default delay between attempts to enqueue into a full ingestion queue.
pub const DEFAULT_ADD_BACKOFF: Duration = Duration::from_millis(100);

// == Generation Ids ==
/// Ids of the three generations. Always `old < current < next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationIds {
    pub old: i64,
    pub current: i64,
    pub next: i64,
}

#[derive(Debug)]
struct Generations {
    old: ReplLog,
    current: ReplLog,
    next: ReplLog,
    ingest_rx: mpsc::Receiver<ReplItem>,
    /// Item drained past the watermark, first in line for the next rotation
    parked: Option<ReplItem>,
}

impl Generations {
    /// Moves queued items into Next until one newer than `watermark` shows up.
    fn drain_up_to(&mut self, watermark: u64) -> usize {
        let mut drained = 0;
        loop {
            let item = match self.parked.take() {
                Some(item) => item,
                None => match self.ingest_rx.try_recv() {
                    Ok(item) => item,
                    Err(_) => break,
                },
            };

            if item.rec_id() > watermark {
                self.parked = Some(item);
                break;
            }

            self.next.data.push(item);
            drained += 1;
        }
        drained
    }

    fn advance(&mut self, now: i64) {
        for log in [&mut self.old, &mut self.current, &mut self.next] {
            log.info.id += 1;
            log.info.time = now;
        }

        let previous = mem::take(&mut self.current.data);
        self.old.data.extend(previous);

        let hint = self.next.data.len();
        self.current.data = mem::replace(&mut self.next.data, Vec::with_capacity(hint));
    }

    fn ids(&self) -> GenerationIds {
        GenerationIds {
            old: self.old.info.id,
            current: self.current.info.id,
            next: self.next.info.id,
        }
    }
}

// == Replication Log ==
/// Collects mutation records into append-only generations.
///
/// Producers call [`add`](Self::add); a timer calls
/// [`rotate`](Self::rotate), which drains the queue into Next and shifts
/// Next into Current and Current into Old.
#[derive(Debug)]
pub struct ReplicationLog {
    ids: Arc<RecordIdAllocator>,
    ingest_tx: mpsc::Sender<ReplItem>,
    backoff: Duration,
    generations: RwLock<Generations>,
}

impl ReplicationLog {
    // == Constructor ==
    /// Creates a log whose ingestion queue holds at most `queue_size` items.
    ///
    /// # Panics
    /// Panics if `queue_size` is zero.
    pub fn new(ids: Arc<RecordIdAllocator>, queue_size: usize) -> Self {
        let (ingest_tx, ingest_rx) = mpsc::channel(queue_size);

        Self {
            ids,
            ingest_tx,
            backoff: DEFAULT_ADD_BACKOFF,
            generations: RwLock::new(Generations {
                old: ReplLog::with_id(0),
                current: ReplLog::with_id(1),
                next: ReplLog::with_id(2),
                ingest_rx,
                parked: None,
            }),
        }
    }

    /// Sets the delay between retries while the ingestion queue is full.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    // == Add ==
    /// Enqueues `item`, retrying after the backoff delay while the queue is
    /// full.
    ///
    /// Never fails, but under sustained overload (or with rotation stopped)
    /// this waits indefinitely.
    pub async fn add(&self, item: ReplItem) {
        let mut item = item;
        let mut retries: u64 = 0;

        loop {
            match self.ingest_tx.try_send(item) {
                Ok(()) => {
                    if retries > 0 {
                        debug!(retries, "Replication item enqueued after backoff");
                    }
                    return;
                }
                Err(TrySendError::Full(returned)) => {
                    if retries == 0 {
                        warn!(
                            rec_id = returned.rec_id(),
                            backoff_ms = self.backoff.as_millis() as u64,
                            "Replication queue full, backing off"
                        );
                    }
                    item = returned;
                    retries += 1;
                    tokio::time::sleep(self.backoff).await;
                }
                Err(TrySendError::Closed(returned)) => {
                    warn!(rec_id = returned.rec_id(), "Replication queue closed, dropping item");
                    return;
                }
            }
        }
    }

    // == Rotate ==
    /// Rotates using the latest allocated record id as the watermark.
    ///
    /// Returns true if the generations advanced.
    pub async fn rotate(&self) -> bool {
        let watermark = self.ids.latest();
        self.rotate_up_to(watermark).await
    }

    /// Drains queued items with `rec_id <= watermark` into Next and, if Next
    /// is non-empty, advances all three generations by one.
    ///
    /// The first item found above the watermark is held back for the next
    /// rotation.
    pub async fn rotate_up_to(&self, watermark: u64) -> bool {
        let mut gens = self.generations.write().await;

        let drained = gens.drain_up_to(watermark);
        if gens.next.data.is_empty() {
            debug!(watermark, "Replication rotation skipped, nothing new");
            return false;
        }

        gens.advance(current_unix_secs());

        info!(
            generation = gens.current.info.id,
            drained,
            current_len = gens.current.data.len(),
            old_len = gens.old.data.len(),
            held_back = gens.parked.is_some(),
            "Replication log rotated"
        );
        true
    }

    // == Accessors ==
    /// Returns the ids of Old, Current and Next.
    pub async fn generation_ids(&self) -> GenerationIds {
        self.generations.read().await.ids()
    }

    /// Returns a copy of the Current generation.
    pub async fn current(&self) -> ReplLog {
        self.generations.read().await.current.clone()
    }

    pub async fn current_len(&self) -> usize {
        self.generations.read().await.current.data.len()
    }

    pub async fn old_len(&self) -> usize {
        self.generations.read().await.old.data.len()
    }

    /// Hands the accumulated Old generation to a shipper.
    ///
    /// Old keeps its id and starts over empty.
    pub async fn take_old(&self) -> ReplLog {
        let mut gens = self.generations.write().await;
        ReplLog {
            info: gens.old.info,
            data: mem::take(&mut gens.old.data),
        }
    }

    /// Number of items added but not yet drained into a generation.
    pub async fn queued(&self) -> usize {
        let parked = usize::from(self.generations.read().await.parked.is_some());
        self.ingest_tx.max_capacity() - self.ingest_tx.capacity() + parked
    }
}
