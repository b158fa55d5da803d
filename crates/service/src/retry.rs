use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Bounded retry with exponential backoff, applied to gateway calls that can
/// fail transiently (lock-wait timeouts, dropped connections). Only
/// `ServiceError::Transient` is ever re-attempted; everything else surfaces
/// immediately.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    enabled: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration, enabled: bool) -> Self {
        Self { max_attempts, backoff_base, backoff_max, enabled }
    }

    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_attempts(&self) -> u32 {
        if self.enabled { self.max_attempts } else { 1 }
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        if !self.enabled || attempt == 0 {
            return;
        }

        let backoff_ms = self.backoff_base.as_millis() as u64 * (2_u64.pow(attempt - 1));
        let backoff_duration = Duration::from_millis(backoff_ms.min(self.backoff_max.as_millis() as u64));

        debug!("retrying in {:?} (attempt {})", backoff_duration, attempt);
        sleep(backoff_duration).await;
    }

    pub fn should_retry(&self, attempt: u32, error: &ServiceError) -> bool {
        if !self.enabled {
            return false;
        }
        if attempt >= self.max_attempts {
            debug!("max retry attempts ({}) reached", self.max_attempts);
            return false;
        }
        matches!(error, ServiceError::Transient(_))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(300), Duration::from_secs(3), true)
    }
}

pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ServiceError>>,
{
    let mut last_error = None;

    for attempt in 0..policy.max_attempts() {
        if attempt > 0 {
            policy.wait_before_retry(attempt).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("operation succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(error) => {
                warn!("operation failed on attempt {}: {}", attempt + 1, error);

                if attempt + 1 < policy.max_attempts() && policy.should_retry(attempt + 1, &error) {
                    last_error = Some(error);
                    continue;
                } else {
                    return Err(error);
                }
            }
        }
    }

    // Unreachable: the loop always returns
    Err(last_error.unwrap_or_else(|| ServiceError::Db("retry loop exited without result".into())))
}
