//! Bounded retry with exponential backoff for the generation call.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::GenerationError;

/// Retry policy: total attempt budget plus backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exponential.min(self.max_delay.as_millis() as u64))
    }
}

/// Runs `operation` under the policy, retrying only transient failures.
///
/// Non-transient errors (malformed or empty responses) return immediately
/// without consuming further attempts. The last error is returned once the
/// attempt budget is spent.
pub async fn retry_generation<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt + 1 >= policy.max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "generation attempt {} failed, retrying in {:?}: {err}",
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
