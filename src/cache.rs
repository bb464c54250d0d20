//! BoundedCache - TTL and size bounded key/value store
//!
//! Entries expire after a fixed time-to-live and the entry count is capped.
//! When the cap is reached the least-recently-inserted entry is evicted first
//! (insertion-order eviction, not LRU-on-read). The cache is single-context:
//! it is only ever touched from the orchestration thread, so it carries no
//! internal locking.

use instant::Instant;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Key/value cache with TTL expiry and insertion-order eviction
pub struct BoundedCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys in insertion order, oldest first
    order: VecDeque<K>,
    max_size: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    /// Create a cache holding at most `max_size` entries, each valid for `ttl`
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
            ttl,
        }
    }

    /// Look up a value; an entry past its TTL is removed and treated as absent
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|e| e.inserted_at.elapsed() > self.ttl);

        if expired {
            self.entries.remove(key);
            self.order.retain(|k| k != key);
            return None;
        }

        self.entries.get(key).map(|e| &e.value)
    }

    /// Insert or replace a value
    ///
    /// Replacing an existing key resets its timestamp and counts as a fresh
    /// insertion for eviction ordering. When the cache is full the oldest
    /// entry is evicted before the new one goes in.
    pub fn set(&mut self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }

        if self.entries.remove(&key).is_some() {
            self.order.retain(|k| k != &key);
        }

        while self.entries.len() >= self.max_size {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    tracing::debug!("cache evicted oldest entry");
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Current entry count (expired entries are counted until observed)
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
