//! Memoizer Module
//!
//! Wraps functions so repeated calls with the same derived key are served
//! from a shared [`ResponseCache`].
//!
//! Only successful results are cached. A failed async call leaves the cache
//! untouched, so the next identical call reaches the real function again.
//! Concurrent identical calls are not coalesced: each miss that is still in
//! flight produces its own underlying call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::{lock, SharedCache, DEFAULT_CACHE_TTL};

/// Derives a cache key from call arguments. Returning `None` bypasses the cache.
pub type KeyFn<A> = Arc<dyn Fn(&A) -> Option<String> + Send + Sync>;

/// Default key derivation: the JSON serialization of the arguments.
pub fn default_key<A: Serialize>(args: &A) -> Option<String> {
    serde_json::to_string(args).ok()
}

// == Memoizer ==
/// Builds memoized wrappers that share one cache.
#[derive(Debug)]
pub struct Memoizer<V> {
    cache: SharedCache<V>,
}

impl<V> Clone for Memoizer<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<V: Clone> Memoizer<V> {
    pub fn new(cache: SharedCache<V>) -> Self {
        Self { cache }
    }

    /// Returns the backing cache.
    pub fn cache(&self) -> &SharedCache<V> {
        &self.cache
    }

    // == Lookup ==
    /// Returns a cached value for `key`, if one is live.
    pub fn lookup(&self, key: &str) -> Option<V> {
        lock(&self.cache).get(key)
    }

    // == Store ==
    /// Stores a value under `key`.
    pub fn store(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        lock(&self.cache).set(key, value, ttl);
    }

    // == Get Or Try Insert ==
    /// Serves `key` from the cache, or awaits `f` and caches its success.
    ///
    /// The cache lock is never held while `f` runs. Errors are returned
    /// unchanged and nothing is stored for them. A `None` key skips the cache.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: Option<&str>,
        ttl: Option<Duration>,
        f: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let Some(key) = key else {
            return f().await;
        };

        if let Some(hit) = self.lookup(key) {
            debug!(key, "memoized value served from cache");
            return Ok(hit);
        }

        let value = f().await?;
        self.store(key, value.clone(), ttl);
        Ok(value)
    }

    // == Memoize ==
    /// Wraps a synchronous function, keying calls by their serialized arguments.
    pub fn memoize<A, F>(&self, func: F) -> Memoized<A, V, F>
    where
        A: Serialize + 'static,
        F: Fn(&A) -> V,
    {
        self.memoize_with_key(func, default_key::<A>)
    }

    /// Wraps a synchronous function with a custom key derivation.
    pub fn memoize_with_key<A, F, K>(&self, func: F, key_fn: K) -> Memoized<A, V, F>
    where
        F: Fn(&A) -> V,
        K: Fn(&A) -> Option<String> + Send + Sync + 'static,
    {
        Memoized {
            memo: self.clone(),
            func,
            key_fn: Arc::new(key_fn),
            ttl: Some(DEFAULT_CACHE_TTL),
        }
    }

    // == Memoize Async ==
    /// Wraps a fallible async function, keying calls by their serialized arguments.
    pub fn memoize_async<A, F>(&self, func: F) -> MemoizedAsync<A, V, F>
    where
        A: Serialize + 'static,
    {
        self.memoize_async_with_key(func, default_key::<A>)
    }

    /// Wraps a fallible async function with a custom key derivation.
    pub fn memoize_async_with_key<A, F, K>(&self, func: F, key_fn: K) -> MemoizedAsync<A, V, F>
    where
        K: Fn(&A) -> Option<String> + Send + Sync + 'static,
    {
        MemoizedAsync {
            memo: self.clone(),
            func,
            key_fn: Arc::new(key_fn),
            ttl: Some(DEFAULT_CACHE_TTL),
        }
    }
}

// == Memoized ==
/// A synchronous function whose results are cached by key.
pub struct Memoized<A, V, F> {
    memo: Memoizer<V>,
    func: F,
    key_fn: KeyFn<A>,
    ttl: Option<Duration>,
}

impl<A, V, F> Memoized<A, V, F>
where
    V: Clone,
    F: Fn(&A) -> V,
{
    /// Sets the TTL for stored results. `None` caches for the process lifetime.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Calls through the cache. Hits return without invoking the function.
    pub fn call(&self, args: &A) -> V {
        let Some(key) = (self.key_fn)(args) else {
            return (self.func)(args);
        };

        if let Some(hit) = self.memo.lookup(&key) {
            return hit;
        }

        let value = (self.func)(args);
        self.memo.store(key, value.clone(), self.ttl);
        value
    }
}

// == Memoized Async ==
/// A fallible async function whose successful results are cached by key.
pub struct MemoizedAsync<A, V, F> {
    memo: Memoizer<V>,
    func: F,
    key_fn: KeyFn<A>,
    ttl: Option<Duration>,
}

impl<A, V, F> MemoizedAsync<A, V, F>
where
    V: Clone,
{
    /// Sets the TTL for stored results. `None` caches for the process lifetime.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Calls through the cache, awaiting and caching only resolved values.
    pub async fn call<Fut, E>(&self, args: A) -> Result<V, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = (self.key_fn)(&args);
        self.memo
            .get_or_try_insert_with(key.as_deref(), self.ttl, || (self.func)(args))
            .await
    }
}
