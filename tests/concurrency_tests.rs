//! Concurrency Tests for the cache core
//!
//! Many tasks hammer overlapping keys on a multi-threaded runtime.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cacheman::cache::{ExpiringStore, KeyInfo, RecordIdAllocator};
use cacheman::replication::{ReplItem, ReplicationLog};
use cacheman::scheduler::ExpirationScheduler;

const WORKERS: usize = 8;
const OPS_PER_WORKER: usize = 500;
const KEYS: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

/// One store operation as a worker observed it.
#[derive(Debug, Clone)]
enum Outcome {
    Inserted {
        key: &'static str,
        rec_id: u64,
        expires: i64,
    },
    Deleted {
        key: &'static str,
        threshold: i64,
        removed: Option<(u64, i64)>,
    },
    LookedUp {
        key: &'static str,
        now: i64,
        found: Option<(u64, i64)>,
    },
}

/// Small deterministic generator so every run exercises the same mix.
struct OpMix(u64);

impl OpMix {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_store_operations() {
    let ids = Arc::new(RecordIdAllocator::new());
    let store = Arc::new(ExpiringStore::new());

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let ids = ids.clone();
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut mix = OpMix(worker as u64 + 1);
            let mut outcomes = Vec::with_capacity(OPS_PER_WORKER);
            for _ in 0..OPS_PER_WORKER {
                let key = KEYS[mix.next(KEYS.len() as u64) as usize];
                // Expiries and thresholds share a range so deletes land both ways
                let instant = mix.next(100) as i64;
                let outcome = match mix.next(5) {
                    0 | 1 => {
                        let record = ids.new_record(instant, "v");
                        let rec_id = record.rec_id();
                        store.insert(key.to_string(), record).await;
                        Outcome::Inserted {
                            key,
                            rec_id,
                            expires: instant,
                        }
                    }
                    2 | 3 => {
                        let removed = store.delete(key, instant).await;
                        Outcome::Deleted {
                            key,
                            threshold: instant,
                            removed: removed.map(|r| (r.rec_id(), r.expires)),
                        }
                    }
                    _ => {
                        let found = store.lookup(key, instant).await;
                        Outcome::LookedUp {
                            key,
                            now: instant,
                            found: found.map(|r| (r.rec_id(), r.expires)),
                        }
                    }
                };
                outcomes.push(outcome);
                tokio::task::yield_now().await;
            }
            outcomes
        }));
    }

    let mut histories = Vec::new();
    for handle in handles {
        histories.push(handle.await.unwrap());
    }

    // rec_id -> (key, expires) for every insert that happened
    let mut inserted: HashMap<u64, (&str, i64)> = HashMap::new();
    for outcome in histories.iter().flatten() {
        if let Outcome::Inserted { key, rec_id, expires } = outcome {
            assert!(inserted.insert(*rec_id, (*key, *expires)).is_none());
        }
    }
    assert_eq!(ids.latest() as usize, inserted.len());

    let mut removed_ids = HashSet::new();
    let mut successful_deletes: HashMap<&str, usize> = HashMap::new();
    let mut skipped_deletes = 0;
    for outcome in histories.iter().flatten() {
        match outcome {
            Outcome::Deleted {
                key,
                threshold,
                removed: Some((rec_id, expires)),
            } => {
                // Only a record written under this key, expiring at or before
                // the threshold, can be removed, and only once
                assert_eq!(inserted.get(rec_id), Some(&(*key, *expires)));
                assert!(expires <= threshold);
                assert!(removed_ids.insert(*rec_id), "rec_id {} removed twice", rec_id);
                *successful_deletes.entry(*key).or_default() += 1;
            }
            Outcome::Deleted { removed: None, .. } => skipped_deletes += 1,
            Outcome::LookedUp {
                key,
                now,
                found: Some((rec_id, expires)),
            } => {
                assert_eq!(inserted.get(rec_id), Some(&(*key, *expires)));
                assert!(expires > now);
            }
            _ => {}
        }
    }
    assert!(!removed_ids.is_empty(), "no delete ever succeeded");
    assert!(skipped_deletes > 0, "no delete was ever refused");

    // Within one worker, a delete can only remove that worker's own latest
    // insert on the key; earlier ones were already overwritten
    for history in &histories {
        let mut latest_own: HashMap<&str, u64> = HashMap::new();
        let own: HashSet<u64> = history
            .iter()
            .filter_map(|o| match o {
                Outcome::Inserted { rec_id, .. } => Some(*rec_id),
                _ => None,
            })
            .collect();
        for outcome in history {
            match outcome {
                Outcome::Inserted { key, rec_id, .. } => {
                    latest_own.insert(*key, *rec_id);
                }
                Outcome::Deleted {
                    key,
                    removed: Some((rec_id, _)),
                    ..
                } if own.contains(rec_id) => {
                    assert_eq!(latest_own.get(key), Some(rec_id));
                }
                _ => {}
            }
        }
    }

    for key in KEYS {
        match store.lookup(key, i64::MIN).await {
            Some(record) => {
                let rec_id = record.rec_id();
                assert_eq!(inserted.get(&rec_id), Some(&(key, record.expires)));
                assert!(!removed_ids.contains(&rec_id), "{} holds a removed record", key);

                // The survivor is its writer's last insert on the key, and every
                // later delete by that writer had a threshold below its expiry
                let history = histories
                    .iter()
                    .find(|h| {
                        h.iter()
                            .any(|o| matches!(o, Outcome::Inserted { rec_id: r, .. } if *r == rec_id))
                    })
                    .unwrap();
                let position = history
                    .iter()
                    .position(|o| matches!(o, Outcome::Inserted { rec_id: r, .. } if *r == rec_id))
                    .unwrap();
                for later in &history[position + 1..] {
                    match later {
                        Outcome::Inserted { key: k, .. } => assert_ne!(*k, key),
                        Outcome::Deleted {
                            key: k,
                            threshold,
                            removed,
                        } if *k == key => {
                            assert!(*threshold < record.expires);
                            assert!(removed.is_none());
                        }
                        _ => {}
                    }
                }
            }
            None => {
                assert!(
                    successful_deletes.get(key).copied().unwrap_or(0) > 0,
                    "{} is empty without a successful delete",
                    key
                );
            }
        }
    }

    // A threshold covering every expiry clears the store
    for key in KEYS {
        store.delete(key, i64::MAX).await;
    }
    assert!(store.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mutation_pipeline() {
    let ids = Arc::new(RecordIdAllocator::new());
    let store = Arc::new(ExpiringStore::new());
    let (scheduler, _expired) = ExpirationScheduler::new(60, 16);
    let scheduler = Arc::new(scheduler);
    let replication = Arc::new(ReplicationLog::new(ids.clone(), 4096));

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let ids = ids.clone();
        let store = store.clone();
        let scheduler = scheduler.clone();
        let replication = replication.clone();
        handles.push(tokio::spawn(async move {
            for op in 0..100 {
                let key = KeyInfo::new(KEYS[(worker + op) % KEYS.len()], 5_000);
                let record = ids.new_record(key.expires, "v");
                store.insert(key.key.clone(), record.clone()).await;
                replication.add(ReplItem::insert(key.clone(), record)).await;
                scheduler.add(&key).await;
            }
        }));
    }

    // Rotate while producers are running
    let rotator = {
        let replication = replication.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                replication.rotate().await;
                tokio::task::yield_now().await;
            }
        })
    };

    for handle in handles {
        handle.await.unwrap();
    }
    rotator.await.unwrap();
    replication.rotate().await;

    let total = WORKERS * 100;
    assert_eq!(scheduler.pending().await, total);
    assert_eq!(
        replication.old_len().await + replication.current_len().await,
        total
    );
    assert_eq!(replication.queued().await, 0);

    let gen_ids = replication.generation_ids().await;
    assert!(gen_ids.old < gen_ids.current && gen_ids.current < gen_ids.next);
}
