use crate::config::Config;
use crate::error::FetchError;
use crate::release::RepoId;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// `base * 2^retry_count`, saturating.
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(retry_count))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(app_config: &Config) -> Self {
        Self::new(app_config.max_attempts, app_config.retry_base_delay())
    }

    /// Rate limits dictate their own wait; everything else backs off exponentially.
    pub fn delay_for(&self, err: &FetchError, retry_count: u32) -> Duration {
        err.retry_wait()
            .unwrap_or_else(|| retry_delay(retry_count, self.base_delay))
    }

    pub fn budget(&self) -> AttemptBudget {
        AttemptBudget {
            max_attempts: self.max_attempts,
            used: 0,
        }
    }
}

/// Attempts left for one job, shared by all of its retried steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    max_attempts: u32,
    used: u32,
}

impl AttemptBudget {
    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.used)
    }

    fn retries(&self) -> u32 {
        self.used.saturating_sub(1)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the budget runs
/// out. Waits are abandoned as soon as `cancel` fires.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    budget: &mut AttemptBudget,
    cancel: &CancellationToken,
    repo_id: &RepoId,
    step: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        budget.used += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || budget.remaining() == 0 {
            if err.is_retryable() {
                tracing::warn!(repo = %repo_id, step, attempts = budget.used(), error = %err, "Giving up after exhausting attempts");
            }
            return Err(err);
        }

        let wait = policy.delay_for(&err, budget.retries());
        tracing::warn!(
            repo = %repo_id,
            step,
            attempt = budget.used(),
            wait_secs = wait.as_secs_f64(),
            error = %err,
            "Retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
