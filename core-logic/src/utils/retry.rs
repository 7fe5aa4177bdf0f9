use crate::config::DelayRange;
use anyhow::Result;
use std::future::Future;
use tracing::{debug, error, info};

/// Process-wide retry settings. Read-only once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so an operation runs at most
    /// `max_retries + 1` times.
    pub max_retries: u32,
    pub delay: DelayRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: DelayRange::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: DelayRange) -> Self {
        Self { max_retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Runs `operation` until it succeeds or the policy is exhausted.
///
/// Every failure is logged. Between attempts the task sleeps for a delay
/// drawn from `policy.delay`. The operation must be safe to repeat.
///
/// After the last attempt the final error is returned with the operation name
/// and attempt count attached as context.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if retries > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, retries + 1);
                }
                return Ok(result);
            }
            Err(e) => {
                retries += 1;
                error!("{} | Error | {:#}", operation_name, e);

                if retries > policy.max_retries {
                    return Err(e.context(format!(
                        "{} failed after {} attempts",
                        operation_name,
                        policy.max_attempts()
                    )));
                }

                let delay = policy.delay.sample();
                info!(
                    "{} | Retrying... {}/{} (sleeping {}s)",
                    operation_name,
                    retries,
                    policy.max_retries,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
