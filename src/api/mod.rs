//! API Module
//!
//! HTTP handlers and routing for the gateway's admin and proxy surface.
//!
//! # Endpoints
//! - `GET /health`, `GET /stats`, `GET /circuits`, `POST /circuits/reset`
//! - `GET /errors`, `DELETE /errors`, `DELETE /cache`
//! - `GET|POST|PUT|DELETE /proxy/*path`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
