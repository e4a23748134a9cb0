//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Counters ==
/// Running counters kept by the cache between snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache. Taking a snapshot has no side effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Current number of entries in the cache
    pub size: usize,
    /// Stored keys, oldest insertion first
    pub keys: Vec<String>,
    /// Number of lookups that returned a live value
    pub hits: u64,
    /// Number of lookups that found nothing or an expired entry
    pub misses: u64,
    /// Number of entries evicted to respect capacity
    pub evictions: u64,
    /// Number of entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl CacheStats {
    pub(crate) fn from_parts(keys: Vec<String>, counters: Counters) -> Self {
        Self {
            size: keys.len(),
            keys,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
