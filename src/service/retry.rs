use std::future::Future;
use std::time::Duration;

use crate::service::error::{ErrorClass, FundingError};
use crate::service::FundingResult;

/// Uniform retry policy applied to every pipeline step.
///
/// Backoff for 1-indexed attempt `n` is `base_backoff * 2^(n-1)`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Runs `op` under `policy`, retrying transient errors with exponential
/// backoff. Fatal and ambiguous errors are returned immediately; deciding
/// what to do with an ambiguous error is the caller's job, because it
/// requires re-checking authoritative chain state.
///
/// After the attempt budget is exhausted the last transient error is
/// returned.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    step: &str,
    mut op: F,
) -> FundingResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FundingResult<T>>,
{
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.classify() == ErrorClass::Transient => {
                if attempt >= policy.max_attempts {
                    tracing::warn!("{step}: giving up after {attempt} attempts: {e}");
                    return Err(e);
                }

                let delay = policy.backoff(attempt);
                tracing::warn!(
                    "{step}: attempt {attempt}/{} failed ({e}), retrying in {delay:?}",
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
