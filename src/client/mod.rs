//! Client Module
//!
//! The transport seam, the fallback wrapper and the resilient API client that
//! composes them with the cache and resilience layers.

mod api_client;
mod safe;
mod transport;

pub use api_client::{service_key, ClientConfig, ResilientClient};
pub use safe::{safe_call, ErrorCallback, RequestOptions};
pub use transport::{decode_body, ApiRequest, ApiResponse, HttpTransport, Method, Transport};
