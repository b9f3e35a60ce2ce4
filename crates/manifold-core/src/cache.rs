//! Fingerprint-keyed result cache with TTL expiry and LRU eviction.
//!
//! Expiry is lazy: an entry past its TTL is purged when a lookup touches
//! it, not by a background sweeper. Capacity is enforced on insert by
//! evicting the least-recently-used entry first. All operations are plain
//! bookkeeping on an in-memory map; anything that would breach a cache
//! invariant is reported as a [`CacheFault`] for the router to log and
//! treat as a miss, never as an execution failure.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::engine::EngineId;
use crate::error::CacheFault;
use crate::task::Fingerprint;

/// The cached outcome of a successful execution: the result payload and
/// the engine that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResult {
    pub result: String,
    pub engine: EngineId,
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedResult,
    inserted_at: Instant,
    last_used: Instant,
}

/// Bounded in-memory result cache.
pub struct ResultCache {
    inner: Mutex<HashMap<Fingerprint, CacheEntry>>,
    max_entries: usize,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache holding at most `max_entries` entries, each live for
    /// `ttl` after insertion. `max_entries == 0` disables storage.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_entries,
            ttl,
        }
    }

    /// Look up a fingerprint. An expired entry is purged and reported as
    /// absent; a live entry has its LRU timestamp refreshed.
    pub fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CachedResult>, CacheFault> {
        let mut map = self.inner.lock();
        if let Some(entry) = map.get_mut(fingerprint) {
            if entry.inserted_at.elapsed() < self.ttl {
                entry.last_used = Instant::now();
                return Ok(Some(entry.value.clone()));
            }
            map.remove(fingerprint);
        }
        Ok(None)
    }

    /// Insert a result, evicting the least-recently-used entry first when
    /// at capacity. Re-inserting an existing fingerprint replaces the
    /// entry and restarts its TTL, keeping at most one live entry per
    /// fingerprint.
    pub fn put(&self, fingerprint: Fingerprint, value: CachedResult) -> Result<(), CacheFault> {
        if self.max_entries == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut map = self.inner.lock();

        if !map.contains_key(&fingerprint) && map.len() >= self.max_entries {
            evict_lru(&mut map)?;
        }

        map.insert(
            fingerprint,
            CacheEntry {
                value,
                inserted_at: now,
                last_used: now,
            },
        );

        if map.len() > self.max_entries {
            return Err(CacheFault(format!(
                "size invariant breached: {} entries with max_entries {}",
                map.len(),
                self.max_entries
            )));
        }
        Ok(())
    }

    /// Administrative flush of every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

fn evict_lru(map: &mut HashMap<Fingerprint, CacheEntry>) -> Result<(), CacheFault> {
    let lru = map
        .iter()
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(fingerprint, _)| fingerprint.clone());

    match lru {
        Some(fingerprint) => {
            map.remove(&fingerprint);
            Ok(())
        }
        None => Err(CacheFault(
            "eviction requested on an empty cache".to_string(),
        )),
    }
}
