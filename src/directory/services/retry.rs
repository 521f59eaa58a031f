//! Retry-with-backoff for transient directory failures.

use crate::config::RetryPolicy;
use crate::directory::ports::DirectoryResult;
use std::future::Future;
use tracing::warn;

/// Runs a directory call, retrying transient failures under `policy`.
///
/// Not-found errors are terminal and returned immediately. The last
/// transient error is returned once attempts are exhausted.
///
/// # Errors
///
/// Returns the final [`crate::directory::ports::DirectoryError`] from `call`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
) -> DirectoryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DirectoryResult<T>>,
{
    let mut attempt: u32 = 1;
    let mut backoff = policy.initial_backoff;
    loop {
        match call().await {
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    operation,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient directory failure, retrying"
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                backoff = policy.next_backoff(backoff);
                attempt = attempt.saturating_add(1);
            }
            outcome => return outcome,
        }
    }
}
