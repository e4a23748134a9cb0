//! Resilient API client
//!
//! Layering per call, outermost first:
//!
//! ```text
//! safe_call (non-strict verbs only)  -> fallback on failure
//!   memoizer (GET only)              -> keyed by full URL incl. query
//!     circuit breaker                -> keyed by URL path without query
//!       retry executor               -> backoff on transient failures
//!         transport                  -> one network call
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::{lock, Memoizer, DEFAULT_CACHE_TTL};
use crate::client::safe::{safe_call, RequestOptions};
use crate::client::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{ApiError, Result};
use crate::resilience::{ResilienceContext, RetryConfig, RetryExecutor};

/// Circuit key for a URL: everything before the query string or fragment.
pub fn service_key(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

// == Client Config ==
/// Defaults applied when a call does not override them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub retry: RetryConfig,
    /// TTL for memoized GET responses; None keeps them until evicted
    pub cache_ttl: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            cache_ttl: Some(DEFAULT_CACHE_TTL),
        }
    }
}

// == Resilient Client ==
/// API client that hardens every call with retry, circuit breaking and,
/// for GET, response caching.
///
/// `get/post/put/delete` never fail: they return the call's fallback
/// instead. The `try_*` variants return the error.
#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    context: ResilienceContext,
    memo: Memoizer<Value>,
    retry: RetryExecutor,
    config: ClientConfig,
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResilientClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        context: ResilienceContext,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            memo: Memoizer::new(context.cache.clone()),
            retry: RetryExecutor::new(context.error_log.clone()),
            context,
            config,
        }
    }

    pub fn context(&self) -> &ResilienceContext {
        &self.context
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // == Safe Verbs ==
    pub async fn get(&self, url: &str, options: &RequestOptions) -> Value {
        safe_call(
            url,
            self.try_get(url, options),
            options.fallback.clone(),
            options.on_error.as_ref(),
        )
        .await
    }

    pub async fn post(&self, url: &str, data: Option<Value>, options: &RequestOptions) -> Value {
        safe_call(
            url,
            self.try_post(url, data, options),
            options.fallback.clone(),
            options.on_error.as_ref(),
        )
        .await
    }

    pub async fn put(&self, url: &str, data: Option<Value>, options: &RequestOptions) -> Value {
        safe_call(
            url,
            self.try_put(url, data, options),
            options.fallback.clone(),
            options.on_error.as_ref(),
        )
        .await
    }

    pub async fn delete(&self, url: &str, data: Option<Value>, options: &RequestOptions) -> Value {
        safe_call(
            url,
            self.try_delete(url, data, options),
            options.fallback.clone(),
            options.on_error.as_ref(),
        )
        .await
    }

    // == Strict Verbs ==
    /// GET served from the cache when possible; successes are cached.
    pub async fn try_get(&self, url: &str, options: &RequestOptions) -> Result<Value> {
        let key = (!options.skip_cache).then_some(url);
        let ttl = options.cache_ttl.or(self.config.cache_ttl);

        self.memo
            .get_or_try_insert_with(key, ttl, || async {
                self.try_send(Method::Get, url, None, options)
                    .await
                    .map(|response| response.body)
            })
            .await
    }

    pub async fn try_post(
        &self,
        url: &str,
        data: Option<Value>,
        options: &RequestOptions,
    ) -> Result<Value> {
        self.try_send(Method::Post, url, data, options)
            .await
            .map(|response| response.body)
    }

    pub async fn try_put(
        &self,
        url: &str,
        data: Option<Value>,
        options: &RequestOptions,
    ) -> Result<Value> {
        self.try_send(Method::Put, url, data, options)
            .await
            .map(|response| response.body)
    }

    pub async fn try_delete(
        &self,
        url: &str,
        data: Option<Value>,
        options: &RequestOptions,
    ) -> Result<Value> {
        self.try_send(Method::Delete, url, data, options)
            .await
            .map(|response| response.body)
    }

    // == Clear Cache ==
    /// Invalidates one memoized GET by URL, or the whole cache when `url` is None.
    ///
    /// Returns the number of entries removed.
    pub fn clear_cache(&self, url: Option<&str>) -> usize {
        let mut cache = lock(&self.context.cache);
        match url {
            Some(url) => usize::from(cache.delete(url)),
            None => {
                let removed = cache.len();
                cache.clear();
                removed
            }
        }
    }

    // == Send ==
    /// Runs one request through the breaker and the retry executor, never the
    /// cache, and returns the full upstream response.
    ///
    /// Used where the upstream status matters, e.g. a 201 from a write.
    pub async fn try_send(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        let service = service_key(url);
        let retry_config = options.retry.as_ref().unwrap_or(&self.config.retry);
        let request = ApiRequest::new(method, url, body);
        debug!(%method, url, service, "dispatching request");

        let result = self
            .context
            .breaker
            .exec(service, || {
                self.retry.fetch_with_retry(url, retry_config, || {
                    self.transport.send(request.clone())
                })
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(err) => {
                if let ApiError::CircuitOpen { .. } = err {
                    self.context.error_log.record(url, &err);
                }
                Err(err)
            }
        }
    }
}
