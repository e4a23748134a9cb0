//! Error types for the resilience layer
//!
//! Every downstream outcome is classified once, at the point where it is first
//! observed, into one of four tagged variants. Everything above that point
//! matches on the tag instead of inspecting status codes or messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// == Api Error Enum ==
/// Unified error type for calls made through the resilience layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Failure matching the retry signal set (retryable status or no response)
    #[error("transient failure{}: {message}", fmt_status(.status))]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Failure outside the retry signal set, surfaced without retrying
    #[error("permanent failure{}: {message}", fmt_status(.status))]
    Permanent {
        status: Option<u16>,
        message: String,
    },

    /// Call rejected by an open circuit; the downstream was never invoked
    #[error("circuit breaker open for service {service}")]
    CircuitOpen { service: String },

    /// Transient failures persisted through every allowed attempt
    #[error("request failed after {attempts} attempts: {last}")]
    Terminal { attempts: u32, last: Box<ApiError> },
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl ApiError {
    /// Creates a transient error carrying an upstream status.
    pub fn transient(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transient {
            status,
            message: message.into(),
        }
    }

    /// Creates a permanent error carrying an upstream status.
    pub fn permanent(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Permanent {
            status,
            message: message.into(),
        }
    }

    /// Returns the tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transient { .. } => ErrorKind::Transient,
            ApiError::Permanent { .. } => ErrorKind::Permanent,
            ApiError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            ApiError::Terminal { .. } => ErrorKind::Terminal,
        }
    }

    /// Upstream status code, if one was observed. Terminal errors report the
    /// status of their last attempt.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transient { status, .. } | ApiError::Permanent { status, .. } => *status,
            ApiError::CircuitOpen { .. } => None,
            ApiError::Terminal { last, .. } => last.status(),
        }
    }

    /// Returns true if this error came from an open circuit.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ApiError::CircuitOpen { .. })
    }
}

// == Error Kind ==
/// Tag of an [`ApiError`], used by the error log and the gateway responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Permanent,
    CircuitOpen,
    Terminal,
}

// == Transport Error ==
/// Errors raised by a [`crate::client::Transport`] before any response exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No response was received (connection refused, reset, timed out)
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built or the response could not be read
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Permanent {
                status: Some(code), ..
            } => StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY),
            _ => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

// == Gateway Error ==
/// Errors raised by the gateway while reading an incoming request, before
/// anything is forwarded upstream.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The body is not valid JSON for the endpoint
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// A non-empty body arrived without a JSON content type
    #[error("unsupported content type {0:?}, expected application/json")]
    UnsupportedMediaType(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, kind) = match self {
            GatewayError::Api(err) => return err.into_response(),
            GatewayError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "invalid_body"),
            GatewayError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            GatewayError::MethodNotAllowed(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed")
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the resilience layer.
pub type Result<T> = std::result::Result<T, ApiError>;
