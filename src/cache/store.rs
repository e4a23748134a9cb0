//! Response Cache Module
//!
//! Bounded key/value store with per-entry expiry and FIFO eviction.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::stats::Counters;
use crate::cache::{CacheEntry, CacheStats, InsertionOrder};

// == Response Cache ==
/// In-memory cache with TTL expiry and strict FIFO eviction.
///
/// Eviction always removes the earliest inserted surviving key. Reads and
/// overwrites do not change a key's position.
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    order: InsertionOrder,
    counters: Counters,
    max_size: usize,
}

impl<V: Clone> ResponseCache<V> {
    // == Constructor ==
    /// Creates a new cache holding at most `max_size` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            counters: Counters::default(),
            max_size: max_size.max(1),
        }
    }

    // == Set ==
    /// Inserts or overwrites an entry.
    ///
    /// If `key` is new and the cache is full, the oldest inserted entry is
    /// evicted first. Without a `ttl` the entry never expires.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let entry = CacheEntry::new(value, ttl);

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = entry;
            return;
        }

        if self.entries.len() >= self.max_size {
            if let Some(evicted) = self.order.evict_oldest() {
                self.entries.remove(&evicted);
                self.counters.record_eviction();
                debug!(key = %evicted, "cache full, evicted oldest entry");
            }
        }

        self.order.push(&key);
        self.entries.insert(key, entry);
    }

    // == Get ==
    /// Returns the stored value if present and unexpired.
    ///
    /// An expired entry is removed as a side effect and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.counters.record_hit();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
            self.order.remove(key);
            self.counters.record_expirations(1);
        }
        self.counters.record_miss();
        None
    }

    // == Delete ==
    /// Removes an entry, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes all entries. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Stats ==
    /// Returns a snapshot of size, keys and counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats::from_parts(self.order.iter().cloned().collect(), self.counters)
    }

    // == Purge Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.order.remove(key);
        }

        self.counters.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_new() {
        let cache: ResponseCache<String> = ResponseCache::new(100);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.max_size(), 100);
    }

    #[test]
    fn test_zero_capacity_raised_to_one() {
        let mut cache = ResponseCache::new(0);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        assert_eq!(cache.max_size(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = ResponseCache::new(100);

        cache.set("key1", "value1".to_string(), None);

        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut cache: ResponseCache<String> = ResponseCache::new(100);
        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_delete() {
        let mut cache = ResponseCache::new(100);

        cache.set("key1", 1, None);
        assert!(cache.delete("key1"));
        assert!(!cache.delete("key1"));

        assert!(cache.is_empty());
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_clear() {
        let mut cache = ResponseCache::new(10);
        cache.set("a", 1, None);
        cache.set("b", 2, None);

        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.stats().keys.is_empty());
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut cache = ResponseCache::new(100);

        cache.set("key1", "value1", None);
        cache.set("key1", "value2", None);

        assert_eq!(cache.get("key1"), Some("value2"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiration_removes_entry() {
        let mut cache = ResponseCache::new(100);

        cache.set("key1", "value1", Some(Duration::from_secs(1)));
        cache.set("key2", "value2", None);
        assert_eq!(cache.get("key1"), Some("value1"));

        tokio::time::advance(Duration::from_millis(1000)).await;

        assert_eq!(cache.get("key1"), None);
        let stats = cache.stats();
        assert_eq!(stats.keys, vec!["key2".to_string()]);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_ttl() {
        let mut cache = ResponseCache::new(10);

        cache.set("key", 1, Some(Duration::from_secs(2)));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("key", 2, Some(Duration::from_secs(2)));
        tokio::time::advance(Duration::from_millis(1500)).await;

        assert_eq!(cache.get("key"), Some(2));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut cache = ResponseCache::new(3);

        cache.set("key1", 1, None);
        cache.set("key2", 2, None);
        cache.set("key3", 3, None);
        cache.set("key4", 4, None);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.get("key2"), Some(2));
        assert_eq!(cache.get("key3"), Some(3));
        assert_eq!(cache.get("key4"), Some(4));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reads_do_not_protect_from_eviction() {
        let mut cache = ResponseCache::new(3);

        cache.set("key1", 1, None);
        cache.set("key2", 2, None);
        cache.set("key3", 3, None);

        // Reading key1 does not move it; it is still the oldest insertion
        cache.get("key1");
        cache.set("key4", 4, None);

        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.get("key2"), Some(2));
    }

    #[test]
    fn test_overwrite_does_not_evict_or_reorder() {
        let mut cache = ResponseCache::new(2);

        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.set("a", 10, None);
        assert_eq!(cache.stats().evictions, 0);

        cache.set("c", 3, None);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_stats_keys_in_insertion_order() {
        let mut cache = ResponseCache::new(10);
        cache.set("z", 1, None);
        cache.set("a", 2, None);
        cache.set("m", 3, None);

        let stats = cache.stats();
        assert_eq!(stats.size, 3);
        assert_eq!(stats.keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_stats_counts_hits_and_misses() {
        let mut cache = ResponseCache::new(100);

        cache.set("key1", 1, None);
        cache.get("key1");
        cache.get("nonexistent");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let mut cache = ResponseCache::new(100);

        cache.set("key1", 1, Some(Duration::from_secs(1)));
        cache.set("key2", 2, Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key2"), Some(2));
    }
}
