//! API Routes
//!
//! Configures the Axum router with the admin endpoints and the proxy.

use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    circuits_handler, clear_cache_handler, drain_errors_handler, health_handler,
    list_errors_handler, proxy_handler, reset_circuits_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Cache statistics
/// - `GET /circuits` - Breaker snapshot per service
/// - `POST /circuits/reset` - Reset one circuit or all
/// - `GET /errors` - Error log snapshot
/// - `DELETE /errors` - Drain the error log
/// - `DELETE /cache` - Invalidate one URL (`?url=`) or the whole cache
/// - `GET|POST|PUT|DELETE /proxy/*path` - Forward to the upstream (other methods: 405)
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/circuits", get(circuits_handler))
        .route("/circuits/reset", post(reset_circuits_handler))
        .route("/errors", get(list_errors_handler).delete(drain_errors_handler))
        .route("/cache", axum::routing::delete(clear_cache_handler))
        .route("/proxy/*path", any(proxy_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
