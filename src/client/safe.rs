//! Fallback wrapper for UI-facing calls
//!
//! The outermost layer converts any failure into a fallback value so callers
//! render an empty or stale state instead of handling every error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::error;

use crate::error::ApiError;
use crate::resilience::RetryConfig;

/// Callback invoked with the failure before the fallback is returned.
pub type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

// == Request Options ==
/// Per-call options for the client verbs.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Value returned by the non-strict verbs on failure
    pub fallback: Value,
    /// Observer for failures absorbed into the fallback
    pub on_error: Option<ErrorCallback>,
    /// Overrides the client's retry policy
    pub retry: Option<RetryConfig>,
    /// Overrides the client's GET cache TTL
    pub cache_ttl: Option<Duration>,
    /// Bypass the GET cache for both lookup and store
    pub skip_cache: bool,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("fallback", &self.fallback)
            .field("on_error", &self.on_error.as_ref().map(|_| "<callback>"))
            .field("retry", &self.retry)
            .field("cache_ttl", &self.cache_ttl)
            .field("skip_cache", &self.skip_cache)
            .finish()
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }
}

// == Safe Call ==
/// Awaits `call`, returning `fallback` instead of any error.
///
/// The failure is logged and handed to `on_error` first. Never fails.
pub async fn safe_call<T, Fut>(
    label: &str,
    call: Fut,
    fallback: T,
    on_error: Option<&ErrorCallback>,
) -> T
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    match call.await {
        Ok(value) => value,
        Err(err) => {
            error!(call = label, kind = ?err.kind(), error = %err, "api call failed, using fallback");
            if let Some(callback) = on_error {
                callback(&err);
            }
            fallback
        }
    }
}
