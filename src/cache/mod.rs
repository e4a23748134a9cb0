//! Cache Module
//!
//! Provides the bounded response cache (TTL expiry, FIFO eviction) and the
//! memoizer built on top of it.

mod entry;
mod fifo;
mod memoize;
mod stats;
mod store;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// Re-export public types
pub use entry::CacheEntry;
pub use fifo::InsertionOrder;
pub use memoize::{default_key, KeyFn, Memoized, MemoizedAsync, Memoizer};
pub use stats::CacheStats;
pub use store::ResponseCache;

// == Public Constants ==
/// Default TTL for memoized results (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default cache capacity
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Cache handle shared between the memoizer, the client and background tasks.
pub type SharedCache<V> = Arc<Mutex<ResponseCache<V>>>;

/// Creates an empty shared cache.
pub fn shared_cache<V: Clone>(max_size: usize) -> SharedCache<V> {
    Arc::new(Mutex::new(ResponseCache::new(max_size)))
}

/// Locks a cache, recovering the guard if a previous holder panicked.
///
/// Every critical section is a short synchronous mutation, so a poisoned
/// cache is still structurally valid.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
