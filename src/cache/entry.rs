//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion time
    pub created_at: Instant,
    /// Expiration time, None = never expires
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Optional time to live, measured from now
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time, so a zero TTL is expired immediately.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a caller-supplied instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
