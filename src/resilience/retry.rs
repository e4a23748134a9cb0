//! Retry executor
//!
//! Runs a downstream call up to `max_retries + 1` times, sleeping with
//! jittered exponential backoff between attempts. Only outcomes in the
//! transient signal set are retried. Each invocation is independent; the
//! executor holds no per-call state.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ApiResponse;
use crate::error::{ApiError, TransportError};
use crate::resilience::backoff::{delay_for_attempt, Rnd};
use crate::resilience::ErrorLog;

/// Status codes retried by default.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

// == Retry Config ==
/// Retry policy for a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts allowed after the first one
    pub max_retries: u32,
    /// Base of the exponential backoff
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier applied per attempt
    pub backoff_factor: f64,
    /// Response statuses treated as transient
    pub retryable_status_codes: HashSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_millis(5000),
            backoff_factor: 2.0,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryConfig {
    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    // == Classify ==
    /// Turns a raw downstream outcome into a success or a tagged error.
    ///
    /// 2xx responses succeed. Statuses in the retry set and network errors are
    /// transient. Everything else is permanent.
    pub fn classify(
        &self,
        outcome: std::result::Result<ApiResponse, TransportError>,
    ) -> std::result::Result<ApiResponse, ApiError> {
        match outcome {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => {
                let message = failure_message(&response);
                if self.is_retryable_status(response.status) {
                    Err(ApiError::transient(Some(response.status), message))
                } else {
                    Err(ApiError::permanent(Some(response.status), message))
                }
            }
            Err(TransportError::Network(message)) => Err(ApiError::transient(None, message)),
            Err(err @ TransportError::InvalidRequest(_)) => {
                Err(ApiError::permanent(None, err.to_string()))
            }
        }
    }
}

/// Prefers a `message` or `error` string from a JSON body over the reason phrase.
fn failure_message(response: &ApiResponse) -> String {
    let from_body = match &response.body {
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    };

    from_body.unwrap_or_else(|| {
        StatusCode::from_u16(response.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("unexpected status")
            .to_string()
    })
}

// == Retry Executor ==
/// Executes calls with bounded exponential-backoff retries.
///
/// Every failure that leaves the executor (permanent, or terminal after the
/// last attempt) is recorded in the error log before it is returned.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    error_log: ErrorLog,
    rnd: Rnd,
}

impl RetryExecutor {
    pub fn new(error_log: ErrorLog) -> Self {
        Self {
            error_log,
            rnd: Rnd::default(),
        }
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    // == Fetch With Retry ==
    /// Runs `request_fn` until it succeeds, fails permanently, or runs out of
    /// attempts.
    ///
    /// On exhaustion the last transient error is wrapped in
    /// [`ApiError::Terminal`].
    pub async fn fetch_with_retry<F, Fut>(
        &self,
        url: &str,
        config: &RetryConfig,
        mut request_fn: F,
    ) -> std::result::Result<ApiResponse, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<ApiResponse, TransportError>>,
    {
        let max_attempts = config.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let err = match config.classify(request_fn().await) {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(url, attempt, "request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(err) => err,
            };

            match err {
                ApiError::Transient { .. } if attempt < max_attempts => {
                    let delay = delay_for_attempt(config, attempt, &self.rnd);
                    debug!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                ApiError::Transient { .. } => {
                    let terminal = ApiError::Terminal {
                        attempts: attempt,
                        last: Box::new(err),
                    };
                    warn!(url, error = %terminal, "retries exhausted");
                    self.error_log.record(url, &terminal);
                    return Err(terminal);
                }
                err => {
                    debug!(url, attempt, error = %err, "non-retryable failure");
                    self.error_log.record(url, &err);
                    return Err(err);
                }
            }
        }
    }
}
