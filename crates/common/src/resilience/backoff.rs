//! Exponential backoff retry
//!
//! Delays grow geometrically from `initial_interval` by `multiplier` up to
//! `max_interval`. Each delay is randomized within
//! `[d * (1 - randomization_factor), d * (1 + randomization_factor)]`.
//! The loop gives up once the next sleep would push the total elapsed time
//! past `max_elapsed_time`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Errors returned by [`retry`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The elapsed-time budget ran out before an attempt succeeded.
    #[error("Retry timeout exceeded after {elapsed:?} ({attempts} attempts): {last}")]
    TimeoutExceeded { attempts: u32, elapsed: Duration, last: E },

    /// The backoff configuration cannot produce delays.
    #[error("Invalid backoff configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> RetryError<E> {
    /// The error of the final attempt, if any attempt ran.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::TimeoutExceeded { last, .. } => Some(last),
            RetryError::InvalidConfiguration { .. } => None,
        }
    }

    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::TimeoutExceeded { last, .. } => Some(last),
            RetryError::InvalidConfiguration { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub randomization_factor: f64,
    pub max_interval: Duration,
    /// `None` retries forever.
    pub max_elapsed_time: Option<Duration>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl ExponentialBackoff {
    /// Default parameters with the given elapsed-time budget.
    pub fn with_max_elapsed(max_elapsed_time: Duration) -> Self {
        Self { max_elapsed_time: Some(max_elapsed_time), ..Self::default() }
    }

    pub fn without_jitter(mut self) -> Self {
        self.randomization_factor = 0.0;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.multiplier < 1.0 {
            return Err(format!("multiplier must be at least 1.0, got {}", self.multiplier));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(format!(
                "randomization_factor must be within [0, 1], got {}",
                self.randomization_factor
            ));
        }
        if self.initial_interval.is_zero() {
            return Err("initial_interval must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Un-randomized interval before attempt `attempt + 1` (0-based).
    pub fn base_interval(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_interval.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_interval
        }
    }

    /// Randomized interval before attempt `attempt + 1`.
    pub fn next_interval(&self, attempt: u32) -> Duration {
        let base = self.base_interval(attempt);
        if self.randomization_factor <= 0.0 {
            return base;
        }
        let delta = base.as_secs_f64() * self.randomization_factor;
        let low = base.as_secs_f64() - delta;
        let high = base.as_secs_f64() + delta;
        let secs = rand::thread_rng().gen_range(low..=high);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Run `operation` until it succeeds or the elapsed-time budget runs out.
///
/// The first attempt starts immediately. Before each sleep the loop checks
/// whether `elapsed + next_delay` exceeds `max_elapsed_time`; if so it returns
/// [`RetryError::TimeoutExceeded`] carrying the last error.
pub async fn retry<F, Fut, T, E>(backoff: &ExponentialBackoff, mut operation: F) -> RetryResult<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Err(message) = backoff.validate() {
        return Err(RetryError::InvalidConfiguration { message });
    }

    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let delay = backoff.next_interval(attempt);
        attempt = attempt.saturating_add(1);
        let elapsed = start.elapsed();

        if let Some(max_elapsed) = backoff.max_elapsed_time {
            if elapsed + delay > max_elapsed {
                warn!(
                    attempts = attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %error,
                    "Retry budget exhausted"
                );
                return Err(RetryError::TimeoutExceeded { attempts: attempt, elapsed, last: error });
            }
        }

        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
