//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use resilient_gateway::client::{ApiRequest, ApiResponse, ClientConfig, Transport};
use resilient_gateway::resilience::{CircuitBreakerConfig, ResilienceContext, RetryConfig};
use resilient_gateway::TransportError;
use serde_json::Value;

pub type Outcome = Result<ApiResponse, TransportError>;

/// Replays scripted outcomes in order, then answers `200 null`.
/// Every request is recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, outcome: Outcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Outcome {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::new(200, Value::Null)))
    }
}

pub fn ok(body: Value) -> Outcome {
    Ok(ApiResponse::new(200, body))
}

pub fn status(code: u16) -> Outcome {
    Ok(ApiResponse::new(code, Value::Null))
}

pub fn network_error() -> Outcome {
    Err(TransportError::Network("connection reset".to_string()))
}

/// Retry policy with short delays so real-time tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        ..RetryConfig::default()
    }
}

pub fn fast_client_config(max_retries: u32) -> ClientConfig {
    ClientConfig {
        retry: fast_retry(max_retries),
        ..ClientConfig::default()
    }
}

pub fn context_with_threshold(failure_threshold: u32) -> ResilienceContext {
    ResilienceContext::new(
        100,
        CircuitBreakerConfig {
            failure_threshold,
            ..CircuitBreakerConfig::default()
        },
        50,
    )
}
