use anyhow::{Context, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: base_delay_ms * 30,
            ..Default::default()
        }
    }

    /// Constant delay between attempts, bounded by a total attempt count.
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_retries: max_attempts.saturating_sub(1),
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            exponential_base: 1.0,
            jitter: false,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay to wait after the failed attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Outcome of [`with_retry_when`]: the final result plus how many attempts ran.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: std::result::Result<T, E>,
    pub attempts: u32,
}

/// Retries `operation` while `retryable` accepts the error and attempts remain.
///
/// The closure receives the one-based attempt number.
pub async fn with_retry_when<T, E, F, Fut, P>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
    retryable: P,
) -> Retried<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(e) => {
                if attempt >= config.max_attempts() || !retryable(&e) {
                    debug!(
                        "{} giving up after attempt {}/{}: {}",
                        operation_name,
                        attempt,
                        config.max_attempts(),
                        e
                    );
                    return Retried {
                        result: Err(e),
                        attempts: attempt,
                    };
                }

                let delay = config.delay_for(attempt - 1);
                debug!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    config.max_attempts(),
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

pub async fn with_retry<T, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcome = with_retry_when(config, operation_name, |_| operation(), |_| true).await;
    let attempts = outcome.attempts;
    outcome.result.with_context(|| {
        format!(
            "{} failed after {} attempts",
            operation_name, attempts
        )
    })
}

pub fn is_transient_error(error: &anyhow::Error) -> bool {
    let error_msg = format!("{:?}", error).to_lowercase();

    let transient_patterns = [
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "network error",
        "temporary failure",
        "service unavailable",
        "rate limited",
        "too many requests",
        "nonce too low",
        "already known",
        "replacement transaction underpriced",
        "busy",
    ];

    transient_patterns
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}
