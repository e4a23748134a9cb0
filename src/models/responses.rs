//! Response DTOs for the gateway admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::resilience::{CircuitState, ErrorRecord, ServiceCircuitState};

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub size: usize,
    pub max_size: usize,
    /// Cached keys, oldest first
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, max_size: usize) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            size: stats.size,
            max_size,
            keys: stats.keys,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
        }
    }
}

/// One service's breaker snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStatus {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Milliseconds until an open circuit admits a trial call
    pub retry_in_ms: Option<u64>,
}

impl CircuitStatus {
    pub fn new(service: String, snapshot: &ServiceCircuitState) -> Self {
        Self {
            service,
            state: snapshot.state,
            failure_count: snapshot.failure_count,
            success_count: snapshot.success_count,
            retry_in_ms: snapshot
                .retry_in()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

/// Response body for GET /circuits
#[derive(Debug, Clone, Serialize)]
pub struct CircuitsResponse {
    pub circuits: Vec<CircuitStatus>,
}

/// Response body for POST /circuits/reset
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub message: String,
    /// Reset service key, or None when every circuit was reset
    pub service: Option<String>,
}

impl ResetResponse {
    pub fn new(service: Option<String>) -> Self {
        let message = match &service {
            Some(key) => format!("Circuit '{}' reset", key),
            None => "All circuits reset".to_string(),
        };
        Self { message, service }
    }
}

/// Response body for GET and DELETE /errors
#[derive(Debug, Clone, Serialize)]
pub struct ErrorsResponse {
    pub count: usize,
    pub capacity: usize,
    pub errors: Vec<ErrorRecord>,
}

impl ErrorsResponse {
    pub fn new(errors: Vec<ErrorRecord>, capacity: usize) -> Self {
        Self {
            count: errors.len(),
            capacity,
            errors,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub message: String,
    pub removed: usize,
}

impl ClearCacheResponse {
    pub fn new(url: Option<&str>, removed: usize) -> Self {
        let message = match url {
            Some(url) => format!("Cache entry for '{}' cleared", url),
            None => "Cache cleared".to_string(),
        };
        Self { message, removed }
    }
}
