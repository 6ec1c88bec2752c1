use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `op` until it succeeds, fails with an error `is_transient` rejects, or
/// `policy.max_attempts` attempts have been made. The last error is returned
/// on exhaustion.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, is_transient: P, op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    retry_with_delay(
        policy.max_attempts,
        |e| is_transient(e).then_some(policy.delay),
        op,
    )
    .await
}

/// Like [`retry`], but the pause before the next attempt depends on the
/// error. `delay_for` returning `None` means the error is not retried.
pub async fn retry_with_delay<T, E, F, Fut, D>(
    max_attempts: u32,
    delay_for: D,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    D: Fn(&E) -> Option<Duration>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let e = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match delay_for(&e) {
            Some(delay) if attempt < max_attempts => {
                debug!("Retry {}/{} due to: {}", attempt, max_attempts, e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            _ => return Err(e),
        }
    }
}
