//! Configuration Module
//!
//! Handles loading gateway and resilience settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::client::ClientConfig;
use crate::resilience::{CircuitBreakerConfig, RetryConfig};

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL relative proxy paths are joined onto
    pub upstream_base_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of memoized responses
    pub cache_max_entries: usize,
    /// TTL in seconds for memoized GET responses
    pub cache_ttl_secs: u64,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    /// Consecutive failures that open a circuit
    pub failure_threshold: u32,
    /// Seconds an open circuit waits before admitting a trial call
    pub reset_timeout_secs: u64,
    /// Trial-call successes needed to close a half-open circuit
    pub half_open_success_threshold: u32,
    pub error_log_capacity: usize,
    /// Per-attempt timeout enforced by the HTTP transport
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_base_url: "http://127.0.0.1:8080".to_string(),
            server_port: 3000,
            cache_max_entries: 100,
            cache_ttl_secs: 300,
            cleanup_interval: 60,
            max_retries: 3,
            initial_delay_ms: 300,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
            failure_threshold: 5,
            reset_timeout_secs: 30,
            half_open_success_threshold: 2,
            error_log_capacity: 50,
            request_timeout_secs: 30,
        }
    }
}

/// Reads `key` and parses it, keeping `default` when unset or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTREAM_BASE_URL` - Upstream base URL (default: http://127.0.0.1:8080)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_ENTRIES` - Cache capacity (default: 100)
    /// - `CACHE_TTL_SECS` - GET memoization TTL (default: 300)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `MAX_RETRIES`, `INITIAL_DELAY_MS`, `MAX_DELAY_MS`, `BACKOFF_FACTOR` - Retry policy
    /// - `FAILURE_THRESHOLD`, `RESET_TIMEOUT_SECS`, `HALF_OPEN_SUCCESS_THRESHOLD` - Breaker policy
    /// - `ERROR_LOG_CAPACITY` - Error log size (default: 50)
    /// - `REQUEST_TIMEOUT_SECS` - Per-attempt timeout (default: 30)
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            upstream_base_url: env_or("UPSTREAM_BASE_URL", d.upstream_base_url),
            server_port: env_or("SERVER_PORT", d.server_port),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", d.cache_max_entries),
            cache_ttl_secs: env_or("CACHE_TTL_SECS", d.cache_ttl_secs),
            cleanup_interval: env_or("CLEANUP_INTERVAL", d.cleanup_interval),
            max_retries: env_or("MAX_RETRIES", d.max_retries),
            initial_delay_ms: env_or("INITIAL_DELAY_MS", d.initial_delay_ms),
            max_delay_ms: env_or("MAX_DELAY_MS", d.max_delay_ms),
            backoff_factor: env_or("BACKOFF_FACTOR", d.backoff_factor),
            failure_threshold: env_or("FAILURE_THRESHOLD", d.failure_threshold),
            reset_timeout_secs: env_or("RESET_TIMEOUT_SECS", d.reset_timeout_secs),
            half_open_success_threshold: env_or(
                "HALF_OPEN_SUCCESS_THRESHOLD",
                d.half_open_success_threshold,
            ),
            error_log_capacity: env_or("ERROR_LOG_CAPACITY", d.error_log_capacity),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", d.request_timeout_secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_factor: self.backoff_factor,
            ..RetryConfig::default()
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_secs),
            half_open_success_threshold: self.half_open_success_threshold,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            retry: self.retry_config(),
            cache_ttl: Some(Duration::from_secs(self.cache_ttl_secs)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
