// src/services/retry.rs
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Outer retry loop around a whole unit of work, with exponential backoff
/// and additive jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-indexed):
    /// `base_delay * 2^attempt + jitter`, jitter in `[0, max_jitter)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        exp.saturating_add(jitter)
    }

    /// Run `op` until it succeeds or the attempt budget is spent. The last
    /// attempt's error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 >= attempts => {
                    warn!(attempt = attempt + 1, error = %err, "giving up after final attempt");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    debug!(attempt = attempt + 2, "retrying");
                    attempt += 1;
                }
            }
        }
    }
}
