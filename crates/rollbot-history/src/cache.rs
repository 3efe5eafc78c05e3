// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, TTL-governed read-through cache in front of the durable store.
//!
//! Entries live in a sharded [`DashMap`], so readers and writers of
//! unrelated keys never contend on one lock. Writers call
//! [`ReadThroughCache::invalidate`] after mutating the store.
//!
//! A fetch that started before an invalidation of its key must not
//! repopulate the cache with what it read. Every invalidation stamps the
//! key with a fresh value of a global counter; a fetch remembers the
//! counter from before it started and only fills the cache if the key has
//! not been stamped since.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use rollbot_core::RollbotError;

struct Slot<V> {
    /// `None` after an invalidation.
    value: Option<V>,
    inserted: Instant,
    invalidated_at: u64,
}

/// Read-through cache keyed by store key.
pub struct ReadThroughCache<V> {
    slots: DashMap<String, Slot<V>>,
    epoch: AtomicU64,
    capacity: usize,
    ttl: Duration,
}

impl<V: Clone + Send + Sync> ReadThroughCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            epoch: AtomicU64::new(0),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result.
    ///
    /// Errors from `fetch` are returned and nothing is cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<V, RollbotError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RollbotError>>,
    {
        if let Some(value) = self.get(key) {
            metrics::counter!("rollbot_cache_hits_total").increment(1);
            debug!(key, "cache hit");
            return Ok(value);
        }
        metrics::counter!("rollbot_cache_misses_total").increment(1);
        debug!(key, "cache miss");

        let started = self.epoch.load(Ordering::SeqCst);
        let value = fetch().await?;
        self.fill(key, value.clone(), started);
        Ok(value)
    }

    /// The live cached value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        let expired = {
            let slot = self.slots.get(key)?;
            match &slot.value {
                Some(value) if slot.inserted.elapsed() < self.ttl => return Some(value.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.slots
                .remove_if(key, |_, slot| slot.inserted.elapsed() >= self.ttl && slot.value.is_some());
        }
        None
    }

    /// Drops the cached value for `key` and fences off fetches already in flight.
    pub fn invalidate(&self, key: &str) {
        let stamp = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        match self.slots.get_mut(key) {
            Some(mut slot) => {
                slot.value = None;
                slot.invalidated_at = stamp;
            }
            None => {
                self.make_room();
                self.slots.insert(
                    key.to_string(),
                    Slot {
                        value: None,
                        inserted: Instant::now(),
                        invalidated_at: stamp,
                    },
                );
            }
        }
        debug!(key, "cache invalidated");
    }

    /// Number of keys holding a live value.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.value.is_some() && s.inserted.elapsed() < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fill(&self, key: &str, value: V, started: u64) {
        if !self.slots.contains_key(key) {
            self.make_room();
        }
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().invalidated_at > started {
                    debug!(key, "skipping cache fill after concurrent invalidation");
                    return;
                }
                let slot = entry.get_mut();
                slot.value = Some(value);
                slot.inserted = Instant::now();
            }
            Entry::Vacant(entry) => {
                // The key's stamp may have been evicted; only trust a quiet epoch.
                if self.epoch.load(Ordering::SeqCst) != started {
                    debug!(key, "skipping cache fill after concurrent invalidation");
                    return;
                }
                entry.insert(Slot {
                    value: Some(value),
                    inserted: Instant::now(),
                    invalidated_at: 0,
                });
            }
        }
    }

    /// Evicts until there is room for one more slot: expired and
    /// invalidated slots first, then the oldest.
    fn make_room(&self) {
        if self.slots.len() < self.capacity {
            return;
        }
        self.slots
            .retain(|_, slot| slot.value.is_some() && slot.inserted.elapsed() < self.ttl);
        while self.slots.len() >= self.capacity {
            let oldest = self
                .slots
                .iter()
                .min_by_key(|s| s.inserted)
                .map(|s| s.key().clone());
            match oldest {
                Some(key) => {
                    self.slots.remove(&key);
                }
                None => break,
            }
        }
    }
}
