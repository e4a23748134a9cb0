//! Backoff delay computation
//!
//! The delay before retry `n` (n >= 1) is
//! `min(initial_delay * backoff_factor^n * jitter, max_delay)` with `jitter`
//! drawn uniformly from `[0.8, 1.2]`.

use std::fmt::Debug;
use std::time::Duration;

use crate::resilience::RetryConfig;

/// Lower bound of the jitter multiplier.
pub const JITTER_MIN: f64 = 0.8;

/// Upper bound of the jitter multiplier.
pub const JITTER_MAX: f64 = 1.2;

// == Random Source ==
/// Non-cryptographic randomness for jitter.
#[derive(Clone, Default)]
pub(crate) enum Rnd {
    #[default]
    Real,

    #[cfg(test)]
    Test(std::sync::Arc<dyn Fn() -> f64 + Send + Sync>),
}

impl Debug for Rnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real => write!(f, "Real"),
            #[cfg(test)]
            Self::Test(_) => write!(f, "Test"),
        }
    }
}

impl Rnd {
    #[cfg(test)]
    pub fn new_fixed(value: f64) -> Self {
        Self::Test(std::sync::Arc::new(move || value))
    }

    /// Returns a value in `[0, 1)`.
    pub fn next_f64(&self) -> f64 {
        match self {
            Self::Real => fastrand::f64(),
            #[cfg(test)]
            Self::Test(generator) => generator(),
        }
    }

    /// Returns a jitter multiplier in `[JITTER_MIN, JITTER_MAX]`.
    pub fn jitter(&self) -> f64 {
        (JITTER_MAX - JITTER_MIN).mul_add(self.next_f64(), JITTER_MIN)
    }
}

// == Delay ==
/// Delay to wait before retry number `attempt`.
pub(crate) fn delay_for_attempt(config: &RetryConfig, attempt: u32, rnd: &Rnd) -> Duration {
    jittered_delay(config, attempt, rnd.jitter())
}

fn jittered_delay(config: &RetryConfig, attempt: u32, jitter: f64) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let max_micros = config.max_delay.as_micros() as f64;
    let micros = config.initial_delay.as_micros() as f64 * config.backoff_factor.powi(exponent) * jitter;

    if !micros.is_finite() || micros >= max_micros {
        return config.max_delay;
    }
    Duration::from_micros(micros.max(0.0).round() as u64)
}
