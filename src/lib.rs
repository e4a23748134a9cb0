//! Resilient Gateway - a resilience layer for calls to a remote HTTP API
//!
//! Wraps every downstream call in retry with exponential backoff, a
//! per-service circuit breaker and, for GET, a bounded TTL response cache.
//! The binary exposes the client as a local proxy with admin endpoints.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod resilience;
pub mod tasks;

pub use api::{create_router, AppState};
pub use client::{HttpTransport, RequestOptions, ResilientClient, Transport};
pub use config::Config;
pub use error::{ApiError, ErrorKind, GatewayError, TransportError};
pub use resilience::ResilienceContext;
pub use tasks::spawn_cleanup_task;
