use std::future::Future;
use std::time::Duration;

use rand::Rng;
use sea_orm::error::DbErr;
use tracing::warn;

use crate::errors::ServiceError;

/// Bounded retry with exponential backoff plus jitter, applied to the
/// ledger's multi-row mutations and other transaction bodies that can hit
/// transient store conflicts under contention.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Deterministic part of the delay before the given retry (0-based
    /// attempt index): base * 2^attempt, capped at max_delay.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.backoff_delay(attempt) + jitter
    }
}

/// Runs `op` up to `policy.max_attempts` times, sleeping between attempts.
/// Errors the predicate rejects surface immediately; a retryable error that
/// survives the whole budget is escalated to a terminal `ConcurrencyError`.
pub async fn retry_with_backoff<T, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
    P: Fn(&ServiceError) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %err,
                        "retry budget exhausted"
                    );
                    return Err(ServiceError::ConcurrencyError(format!(
                        "{} failed after {} attempts: {}",
                        operation, attempt, err
                    )));
                }
                let delay = policy.delay_with_jitter(attempt - 1);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient conflict, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Transient classifier for database errors: deadlocks, serialization
/// failures and lock contention are worth another attempt; everything else
/// is not.
pub fn is_transient_db_err(err: &DbErr) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("deadlock")
        || text.contains("could not serialize access")
        || text.contains("lock timeout")
        || text.contains("database is locked")
        || text.contains("database table is locked")
}
