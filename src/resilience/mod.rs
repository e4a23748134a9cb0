//! Resilience Module
//!
//! Retry with backoff, per-service circuit breaking and the failure log, plus
//! the context object that bundles the shared state a client runs against.

mod backoff;
mod circuit_breaker;
mod error_log;
mod retry;

use serde_json::Value;

pub use backoff::{JITTER_MAX, JITTER_MIN};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, ServiceCircuitState,
};
pub use error_log::{ErrorLog, ErrorRecord, DEFAULT_ERROR_LOG_CAPACITY};
pub use retry::{RetryConfig, RetryExecutor, DEFAULT_RETRYABLE_STATUS_CODES};

use crate::cache::{shared_cache, SharedCache, DEFAULT_MAX_ENTRIES};

// == Resilience Context ==
/// Shared resilience state: the response cache, the circuits and the error log.
///
/// Every client built from clones of one context sees the same state.
/// Construct a fresh context to get isolated state, e.g. one per test.
#[derive(Debug, Clone)]
pub struct ResilienceContext {
    pub cache: SharedCache<Value>,
    pub breaker: CircuitBreaker,
    pub error_log: ErrorLog,
}

impl Default for ResilienceContext {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ENTRIES,
            CircuitBreakerConfig::default(),
            DEFAULT_ERROR_LOG_CAPACITY,
        )
    }
}

impl ResilienceContext {
    pub fn new(
        cache_max_entries: usize,
        breaker_config: CircuitBreakerConfig,
        error_log_capacity: usize,
    ) -> Self {
        Self {
            cache: shared_cache(cache_max_entries),
            breaker: CircuitBreaker::new(breaker_config),
            error_log: ErrorLog::new(error_log_capacity),
        }
    }
}
