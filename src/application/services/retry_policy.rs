use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::domain::ProcessingConfig;

const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Attempt budget and delay schedule shared by file retries and
/// notification delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential: bool,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            max_delay: delay,
            exponential: false,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            exponential: true,
        }
    }

    pub fn for_files(config: &ProcessingConfig) -> Self {
        Self {
            max_attempts: config.max_retries + 1,
            base_delay: config.retry_delay(),
            max_delay: MAX_BACKOFF.max(config.retry_delay()),
            exponential: config.exponential_backoff,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if !self.exponential {
            return self.base_delay;
        }
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget runs out. The closure receives the 1-based
    /// attempt number. On success returns the value and the attempts used.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<(T, u32), E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
