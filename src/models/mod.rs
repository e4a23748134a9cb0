//! Request and Response models for the gateway admin API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ClearCacheQuery, ResetCircuitRequest};
pub use responses::{
    CircuitStatus, CircuitsResponse, ClearCacheResponse, ErrorsResponse, HealthResponse,
    ResetResponse, StatsResponse,
};
