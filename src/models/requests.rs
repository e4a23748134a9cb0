//! Request DTOs for the gateway admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

/// Request body for POST /circuits/reset
///
/// A missing or empty `service` resets every circuit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetCircuitRequest {
    #[serde(default)]
    pub service: Option<String>,
}

impl ResetCircuitRequest {
    /// Returns the targeted service key, treating blank as "all".
    pub fn target(&self) -> Option<&str> {
        self.service
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Query string for DELETE /cache
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearCacheQuery {
    #[serde(default)]
    pub url: Option<String>,
}
