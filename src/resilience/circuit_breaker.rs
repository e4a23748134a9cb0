//! Circuit Breaker implementation for fault tolerance
//!
//! One state machine per service key, created lazily on first use:
//! - Closed: calls pass through; consecutive failures are counted
//! - Open: calls are rejected without reaching the service until the cooldown ends
//! - HalfOpen: trial calls pass through; enough consecutive successes close
//!   the circuit, any failure reopens it
//!
//! The Open -> HalfOpen transition happens when a call arrives after the
//! cooldown, never on a timer. A key with no traffic stays Open.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// State of one service's circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in Closed that open the circuit
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before allowing a trial call
    pub reset_timeout: Duration,
    /// Consecutive HalfOpen successes needed to close the circuit
    pub half_open_success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_success_threshold: 2,
        }
    }
}

// == Service Circuit State ==
/// Breaker bookkeeping for a single service key.
///
/// `failure_count` only moves while Closed and `success_count` only while
/// HalfOpen.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCircuitState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Calls are rejected before this instant while Open
    pub next_attempt_at: Option<Instant>,
}

impl Default for ServiceCircuitState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            next_attempt_at: None,
        }
    }
}

impl ServiceCircuitState {
    /// Time left before an open circuit admits a trial call.
    pub fn retry_in(&self) -> Option<Duration> {
        match self.state {
            CircuitState::Open => self
                .next_attempt_at
                .map(|at| at.saturating_duration_since(Instant::now())),
            _ => None,
        }
    }

    fn trip(&mut self, reset_timeout: Duration) {
        self.state = CircuitState::Open;
        self.next_attempt_at = Some(Instant::now() + reset_timeout);
        self.success_count = 0;
    }
}

/// Per-service circuit breaker.
///
/// Cloning yields another handle to the same set of circuits. State updates
/// are applied in the order calls resolve; the lock is never held while a
/// call is in flight.
///
/// # Example
/// ```no_run
/// use resilient_gateway::resilience::{CircuitBreaker, CircuitBreakerConfig};
/// use resilient_gateway::error::ApiError;
///
/// #[tokio::main]
/// async fn main() -> Result<(), ApiError> {
///     let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
///
///     let value = breaker
///         .exec("/api/widgets", || async { Ok::<_, ApiError>(42) })
///         .await?;
///
///     println!("Result: {}", value);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: Arc<CircuitBreakerConfig>,
    services: Arc<Mutex<HashMap<String, ServiceCircuitState>>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: Arc::new(config),
            services: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Snapshot of one service's circuit. Unknown keys report a fresh Closed state.
    pub async fn get_state(&self, service_key: &str) -> ServiceCircuitState {
        let services = self.services.lock().await;
        services.get(service_key).cloned().unwrap_or_default()
    }

    /// Snapshot of every known circuit, sorted by service key.
    pub async fn states(&self) -> Vec<(String, ServiceCircuitState)> {
        let services = self.services.lock().await;
        let mut states: Vec<_> = services
            .iter()
            .map(|(key, state)| (key.clone(), state.clone()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Force one service back to Closed with zero counters
    pub async fn reset(&self, service_key: &str) {
        self.services.lock().await.remove(service_key);
        info!(service = service_key, "circuit reset");
    }

    /// Force every service back to Closed
    pub async fn reset_all(&self) {
        self.services.lock().await.clear();
        info!("all circuits reset");
    }

    // == Exec ==
    /// Run `op` under the circuit for `service_key`.
    ///
    /// While the circuit is Open and the cooldown has not elapsed, `op` is not
    /// invoked and [`ApiError::CircuitOpen`] is returned.
    pub async fn exec<F, Fut, T>(&self, service_key: &str, op: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.acquire(service_key).await?;

        match op().await {
            Ok(value) => {
                self.on_success(service_key).await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure(service_key).await;
                Err(err)
            }
        }
    }

    /// Admit or reject a call, moving Open to HalfOpen once the cooldown is over
    async fn acquire(&self, service_key: &str) -> Result<(), ApiError> {
        let mut services = self.services.lock().await;
        let circuit = services.entry(service_key.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let ready = circuit
                    .next_attempt_at
                    .map_or(true, |at| Instant::now() >= at);
                if ready {
                    circuit.state = CircuitState::HalfOpen;
                    circuit.success_count = 0;
                    debug!(service = service_key, "cooldown elapsed, circuit half-open");
                    Ok(())
                } else {
                    warn!(service = service_key, "circuit open, rejecting call");
                    Err(ApiError::CircuitOpen {
                        service: service_key.to_string(),
                    })
                }
            }
        }
    }

    async fn on_success(&self, service_key: &str) {
        let mut services = self.services.lock().await;
        let circuit = services.entry(service_key.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed => {
                circuit.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                circuit.success_count += 1;
                if circuit.success_count >= self.config.half_open_success_threshold {
                    *circuit = ServiceCircuitState::default();
                    info!(service = service_key, "service recovered, circuit closed");
                }
            }
            CircuitState::Open => {
                // A call admitted before the trip resolved late; the cooldown stands.
            }
        }
    }

    async fn on_failure(&self, service_key: &str) {
        let mut services = self.services.lock().await;
        let circuit = services.entry(service_key.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed => {
                circuit.failure_count += 1;
                if circuit.failure_count >= self.config.failure_threshold {
                    circuit.trip(self.config.reset_timeout);
                    warn!(
                        service = service_key,
                        failures = circuit.failure_count,
                        "failure threshold reached, circuit open"
                    );
                }
            }
            CircuitState::HalfOpen => {
                circuit.trip(self.config.reset_timeout);
                warn!(service = service_key, "trial call failed, circuit reopened");
            }
            CircuitState::Open => {}
        }
    }
}
