//! Result Cache - single-flight, TTL-bounded store of normalized responses.
//!
//! Keyed by [`QueryIdentity`]. Each key owns a slot holding a
//! `tokio::sync::OnceCell`; concurrent callers for the same identity all
//! await the one computation that initializes it. Expired slots are swapped
//! out on the next lookup and swept by [`cleanup_task`].
//!
//! The cache also owns the request permits, so every executor resolving
//! through one cache shares one concurrency ceiling.

use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{ImpactResponse, QueryIdentity, DEFAULT_CONCURRENCY};
use crate::ports::TimeSource;

/// A stored response and the instant it stops being valid
#[derive(Debug)]
struct CacheEntry {
    response: Arc<ImpactResponse>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
struct Slot {
    cell: OnceCell<CacheEntry>,
}

/// How a lookup was satisfied
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Served from a stored entry or by joining another caller's computation
    Hit(Arc<ImpactResponse>),
    /// This caller ran the computation
    Computed(Arc<ImpactResponse>),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn response(&self) -> &Arc<ImpactResponse> {
        match self {
            Lookup::Hit(response) | Lookup::Computed(response) => response,
        }
    }

    pub fn into_response(self) -> Arc<ImpactResponse> {
        match self {
            Lookup::Hit(response) | Lookup::Computed(response) => response,
        }
    }
}

/// Statistics for the result cache
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Entries removed by [`ResultCache::purge_expired`]
    pub total_purged: AtomicU64,
    /// Expired entries replaced on lookup
    pub total_refreshed: AtomicU64,
    /// Full flushes
    pub total_flushes: AtomicU64,
}

/// Shared response cache
pub struct ResultCache {
    slots: DashMap<QueryIdentity, Arc<Slot>>,
    ttl: Duration,
    clock: Arc<dyn TimeSource>,
    permits: Arc<Semaphore>,
    ceiling: usize,
    stats: CacheStats,
}

impl ResultCache {
    /// Cache with the default concurrency ceiling
    pub fn new(ttl: Duration, clock: Arc<dyn TimeSource>) -> Self {
        Self::with_ceiling(ttl, clock, DEFAULT_CONCURRENCY)
    }

    /// Cache whose callers share at most `ceiling` in-flight computations
    pub fn with_ceiling(ttl: Duration, clock: Arc<dyn TimeSource>, ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            slots: DashMap::new(),
            ttl,
            clock,
            permits: Arc::new(Semaphore::new(ceiling)),
            ceiling,
            stats: CacheStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Request permits shared by everything resolving through this cache
    pub fn permits(&self) -> &Arc<Semaphore> {
        &self.permits
    }

    /// Return the live response for `identity`, running `compute` at most
    /// once across all concurrent callers when there is none.
    ///
    /// The entry's lifetime starts when `compute` finishes. If the computing
    /// caller is dropped mid-flight, the next waiter takes over.
    pub async fn get_or_compute<F, Fut>(&self, identity: &QueryIdentity, compute: F) -> Lookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ImpactResponse>,
    {
        let slot = self.fresh_slot(identity);
        let executed = AtomicBool::new(false);
        let flag = &executed;
        let clock = &self.clock;
        let ttl = self.ttl;

        let entry = slot
            .cell
            .get_or_init(move || async move {
                flag.store(true, Ordering::Relaxed);
                let response = Arc::new(compute().await);
                CacheEntry {
                    response,
                    expires_at: clock.now() + ttl,
                }
            })
            .await;

        let response = Arc::clone(&entry.response);
        if executed.load(Ordering::Relaxed) {
            debug!(query = %identity, "Cache miss, stored response");
            Lookup::Computed(response)
        } else {
            debug!(query = %identity, "Cache hit");
            Lookup::Hit(response)
        }
    }

    /// Slot for `identity` that is either empty, in flight or unexpired
    fn fresh_slot(&self, identity: &QueryIdentity) -> Arc<Slot> {
        loop {
            let slot = Arc::clone(
                self.slots
                    .entry(identity.clone())
                    .or_insert_with(|| Arc::new(Slot::default()))
                    .value(),
            );

            match slot.cell.get() {
                Some(entry) if entry.is_expired(self.clock.now()) => {
                    // Only evict the slot we looked at; another caller may
                    // already have installed a fresh one.
                    if self.slots.remove_if(identity, |_, current| Arc::ptr_eq(current, &slot)).is_some() {
                        self.stats.total_refreshed.fetch_add(1, Ordering::Relaxed);
                        debug!(query = %identity, "Cached response expired");
                    }
                }
                _ => return slot,
            }
        }
    }

    /// Live response for `identity`, without computing anything
    pub fn peek(&self, identity: &QueryIdentity) -> Option<Arc<ImpactResponse>> {
        let slot = self.slots.get(identity)?;
        let entry = slot.cell.get()?;
        if entry.is_expired(self.clock.now()) {
            None
        } else {
            Some(Arc::clone(&entry.response))
        }
    }

    pub fn contains(&self, identity: &QueryIdentity) -> bool {
        self.peek(identity).is_some()
    }

    /// Number of live (stored and unexpired) entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.slots
            .iter()
            .filter(|slot| slot.cell.get().is_some_and(|entry| !entry.is_expired(now)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. In-flight computations still complete for their
    /// own waiters but are not stored for later callers.
    pub fn flush(&self) {
        self.slots.clear();
        self.stats.total_flushes.fetch_add(1, Ordering::Relaxed);
        debug!("Flushed result cache");
    }

    /// Remove expired entries (TTL cleanup).
    ///
    /// Returns the number of entries removed. In-flight slots are kept.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.slots.retain(|identity, slot| match slot.cell.get() {
            Some(entry) if entry.is_expired(now) => {
                debug!(query = %identity, "Removing expired cache entry");
                removed += 1;
                false
            }
            _ => true,
        });

        self.stats.total_purged.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// Background task to purge expired cache entries
pub async fn cleanup_task(cache: Arc<ResultCache>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = cache.purge_expired();
        if removed > 0 {
            debug!(removed = removed, "Purged expired cache entries");
        }
    }
}
