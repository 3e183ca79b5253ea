// src/retry.rs
//! Bounded retry for per-listing work

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Delay applied between two attempts
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately
    None,
    Fixed(Duration),
    /// `base * factor^attempt`
    Exponential { base: Duration, factor: f64 },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { base, factor } => {
                base.mul_f64(factor.powi(attempt as i32).max(0.0))
            }
        }
    }
}

/// `retries` extra attempts after the first one, so `retries = 3` runs the
/// operation at most four times.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(3)
    }
}

impl RetryPolicy {
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            backoff: Backoff::None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    /// The closure receives the zero-based attempt number. The last error is
    /// returned when every attempt failed.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_if(operation, |_| true).await
    }

    /// Like [`run`](Self::run), but an error rejected by `retryable` is
    /// returned at once.
    pub async fn run_if<T, E, F, Fut, R>(&self, mut operation: F, retryable: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries && retryable(&e) => {
                    let delay = self.backoff.delay(attempt);
                    debug!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying: {}",
                        e
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
