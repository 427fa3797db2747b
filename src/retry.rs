//! Bounded retry with a fixed inter-attempt delay.

use std::future::Future;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::errors::Result;

/// Run `op` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between attempts. Every failed attempt is logged with its index; after
/// the last one the underlying error is returned to the caller unchanged.
pub async fn with_retry<T, F, Fut>(label: &str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, label, error = %err, "attempt failed");
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
