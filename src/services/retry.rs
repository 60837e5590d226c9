//! Bounded fixed-backoff retry for rate-limited operations.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::RetryConfig;

/// How often, and how patiently, a rate-limited operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed wait between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff())
    }

    /// Run `op` until it succeeds, fails with a non-rate-limit error, or
    /// the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. On success returns the value
    /// together with the attempt that produced it. Exhaustion yields
    /// `AppError::ExtractionExhausted` labelled with `label`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<(T, u32)>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if e.is_rate_limited() => {
                    log::warn!(
                        "Attempt {} of extracting {} failed. Max attempts = {}.",
                        attempt,
                        label,
                        self.max_attempts
                    );
                    if attempt >= self.max_attempts {
                        log::error!("*** Max attempts of extracting {} reached ***", label);
                        return Err(AppError::ExtractionExhausted {
                            field: label.to_string(),
                            attempts: attempt,
                        });
                    }
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
