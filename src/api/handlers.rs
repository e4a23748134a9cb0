//! API Handlers
//!
//! HTTP request handlers for the admin endpoints and the upstream proxy.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method as HttpMethod, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::cache::lock;
use crate::client::{
    ClientConfig, HttpTransport, Method, RequestOptions, ResilientClient, Transport,
};
use crate::config::Config;
use crate::error::{GatewayError, TransportError};
use crate::models::{
    CircuitStatus, CircuitsResponse, ClearCacheQuery, ClearCacheResponse, ErrorsResponse,
    HealthResponse, ResetCircuitRequest, ResetResponse, StatsResponse,
};
use crate::resilience::ResilienceContext;

type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Application state shared across all handlers.
///
/// The client owns the cache, circuits and error log through its context.
#[derive(Clone, Debug)]
pub struct AppState {
    pub client: ResilientClient,
}

impl AppState {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    /// Builds a client over `transport` with fresh resilience state.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        context: ResilienceContext,
        config: ClientConfig,
    ) -> Self {
        Self::new(ResilientClient::new(transport, context, config))
    }

    /// Creates the state from configuration, talking HTTP to the upstream.
    pub fn from_config(config: &Config) -> std::result::Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.upstream_base_url, config.request_timeout())?;
        let context = ResilienceContext::new(
            config.cache_max_entries,
            config.breaker_config(),
            config.error_log_capacity,
        );
        Ok(Self::with_transport(
            Arc::new(transport),
            context,
            config.client_config(),
        ))
    }

    pub fn context(&self) -> &ResilienceContext {
        self.client.context()
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = lock(&state.context().cache);
    Json(StatsResponse::new(cache.stats(), cache.max_size()))
}

/// Handler for GET /circuits
pub async fn circuits_handler(State(state): State<AppState>) -> Json<CircuitsResponse> {
    let circuits = state
        .context()
        .breaker
        .states()
        .await
        .into_iter()
        .map(|(service, snapshot)| CircuitStatus::new(service, &snapshot))
        .collect();

    Json(CircuitsResponse { circuits })
}

/// Handler for POST /circuits/reset
///
/// Resets the named circuit. An empty body, `{}` or a null `service` resets
/// every circuit; any other unreadable body is rejected and nothing is reset.
pub async fn reset_circuits_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Json<ResetResponse>> {
    let req: ResetCircuitRequest = json_body(&headers, &body)?.unwrap_or_default();
    let breaker = &state.context().breaker;

    match req.target() {
        Some(service) => {
            breaker.reset(service).await;
            info!(service, "circuit reset by admin");
            Ok(Json(ResetResponse::new(Some(service.to_string()))))
        }
        None => {
            breaker.reset_all().await;
            info!("all circuits reset by admin");
            Ok(Json(ResetResponse::new(None)))
        }
    }
}

/// Handler for GET /errors
pub async fn list_errors_handler(State(state): State<AppState>) -> Json<ErrorsResponse> {
    let log = &state.context().error_log;
    Json(ErrorsResponse::new(log.entries(), log.capacity()))
}

/// Handler for DELETE /errors
///
/// Returns the drained records.
pub async fn drain_errors_handler(State(state): State<AppState>) -> Json<ErrorsResponse> {
    let log = &state.context().error_log;
    Json(ErrorsResponse::new(log.drain(), log.capacity()))
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearCacheQuery>,
) -> Json<ClearCacheResponse> {
    let url = query.url.as_deref();
    let removed = state.client.clear_cache(url);
    Json(ClearCacheResponse::new(url, removed))
}

/// Handler for /proxy/*path
///
/// Forwards GET, POST, PUT and DELETE to the upstream through the strict
/// client verbs; other methods get 405. GET responses are cached under the
/// full path including the query string and always come back as 200. Writes
/// keep the upstream's success status (201, 204, ...).
///
/// Write bodies must be empty or JSON; a bad body is rejected before any
/// upstream call.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: HttpMethod,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Response> {
    let verb = if method == HttpMethod::GET {
        Method::Get
    } else if method == HttpMethod::POST {
        Method::Post
    } else if method == HttpMethod::PUT {
        Method::Put
    } else if method == HttpMethod::DELETE {
        Method::Delete
    } else {
        return Err(GatewayError::MethodNotAllowed(method.to_string()));
    };
    let url = match query {
        Some(q) if !q.is_empty() => format!("/{}?{}", path, q),
        _ => format!("/{}", path),
    };
    let options = RequestOptions::default();
    let client = &state.client;

    if verb == Method::Get {
        let value = client.try_get(&url, &options).await?;
        return Ok(Json(value).into_response());
    }

    let data: Option<Value> = json_body(&headers, &body)?;
    let response = client.try_send(verb, &url, data, &options).await?;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);

    if status == StatusCode::NO_CONTENT {
        return Ok(status.into_response());
    }
    Ok((status, Json(response.body)).into_response())
}

/// Decodes an optional JSON request body.
///
/// Empty (or all-whitespace) bodies are `None`. A non-empty body needs a JSON
/// content type and must deserialize into `T`.
fn json_body<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> GatewayResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let is_json = essence.eq_ignore_ascii_case("application/json")
        || essence.to_ascii_lowercase().ends_with("+json");
    if !is_json {
        return Err(GatewayError::UnsupportedMediaType(content_type.to_string()));
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| GatewayError::InvalidBody(e.to_string()))
}
