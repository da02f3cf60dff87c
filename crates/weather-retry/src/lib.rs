//! Exponential backoff retry executor.
//!
//! Wraps a single-attempt async operation (typically an upstream fetch)
//! and retries it on [`ErrorKind::retryable`] failures, up to a fixed
//! number of attempts, sleeping `base * 2^(k-1)` between attempt `k` and
//! `k+1` via the injected [`Clock`].

use std::sync::Arc;
use std::time::Duration;

use weather_core::{Clock, ErrorKind, GatewayError};
use weather_metrics::MetricsRegistry;

/// Tunables for a [`RetryExecutor`]. Defaults: 3 attempts (1 initial + 2
/// retries), 1s initial backoff doubling each attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts including the initial one.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each subsequent attempt.
    pub base_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// The outcome of a retried call: the successful value plus how many
/// retries (attempts beyond the first) were needed.
pub struct Outcome<T> {
    pub value: T,
    pub retry_attempts: u32,
}

pub struct RetryExecutor<C: Clock> {
    clock: Arc<C>,
    metrics: Arc<MetricsRegistry>,
    config: RetryConfig,
}

impl<C: Clock> RetryExecutor<C> {
    pub fn new(clock: Arc<C>, metrics: Arc<MetricsRegistry>, config: RetryConfig) -> Self {
        Self {
            clock,
            metrics,
            config,
        }
    }

    /// Runs `attempt` up to `max_attempts` times. `attempt` is called with
    /// the 1-based attempt number.
    ///
    /// Stops retrying as soon as an error kind is non-retryable
    /// ([`ErrorKind::retryable`] is false), or once `max_attempts` is
    /// exhausted, returning the last error either way.
    pub async fn execute<F, Fut, T>(&self, mut attempt: F) -> Result<Outcome<T>, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let mut last_err: Option<GatewayError> = None;

        for attempt_number in 1..=self.config.max_attempts {
            match attempt(attempt_number).await {
                Ok(value) => {
                    return Ok(Outcome {
                        value,
                        retry_attempts: attempt_number - 1,
                    });
                }
                Err(err) => {
                    let retryable = err.kind().retryable();
                    tracing::debug!(
                        attempt = attempt_number,
                        kind = %err.kind(),
                        retryable,
                        "retry: attempt failed"
                    );
                    if !retryable || attempt_number == self.config.max_attempts {
                        return Err(err);
                    }
                    last_err = Some(err);
                    self.metrics.record_retry();
                    let backoff = self.config.base_backoff.as_secs_f64()
                        * 2f64.powi(attempt_number as i32 - 1);
                    self.clock.sleep(Duration::from_secs_f64(backoff)).await;
                }
            }
        }

        // Unreachable when max_attempts >= 1, kept for exhaustiveness.
        Err(last_err.unwrap_or(GatewayError::Timeout))
    }
}
