//! Bounded retry with exponential backoff and jitter.
//!
//! Outbound provider calls are retried only for recoverable failures
//! (timeouts and retryable provider categories), never indefinitely. The
//! delay doubles each attempt up to a cap, with random jitter to avoid
//! thundering herds against a rate-limited API.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::types::{LoomError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_secs(settings.max_delay_secs),
            backoff_factor: settings.backoff_factor,
        }
    }

    /// Run `operation` until it succeeds, a fatal error occurs, or the attempt
    /// budget is exhausted. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut current_delay = self.base_delay;

        for attempt in 1..=self.max_attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_recoverable() && attempt < self.max_attempts => {
                    // Providers may suggest a wait (e.g. from a 429); honor the
                    // larger of that hint and our backoff schedule.
                    let hinted = match &err {
                        LoomError::Provider(p) => p.recommended_delay(),
                        _ => Duration::ZERO,
                    };
                    let delay = current_delay.max(hinted) + random_jitter(current_delay);
                    warn!(
                        operation = operation_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after recoverable error"
                    );
                    sleep(delay).await;
                    current_delay = calculate_backoff(current_delay, self.backoff_factor, self.max_delay);
                }
                Err(err) => return Err(err),
            }
        }

        // Unreachable: the loop always returns on the final attempt
        Err(LoomError::Config(format!(
            "retry budget misconfigured for {}",
            operation_name
        )))
    }
}

/// Generate random jitter using thread-local RNG
fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    let jitter_ms = rand::rng().random_range(0..max_jitter_ms);
    Duration::from_millis(jitter_ms)
}

/// Calculate next backoff delay with cap
fn calculate_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    let next = Duration::from_secs_f32(current.as_secs_f32() * factor);
    std::cmp::min(next, max)
}
