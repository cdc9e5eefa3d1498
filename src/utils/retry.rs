use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use super::error::{AppError, Result};

/// How long and how often a bounded wait checks before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    attempts: usize,
    interval: Duration,
}

impl PollPolicy {
    pub fn new(attempts: usize, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    /// Check every `interval_ms` until `timeout_ms` has elapsed. Always checks at least once.
    pub fn from_timeout(timeout_ms: u64, interval_ms: u64) -> Self {
        let interval_ms = interval_ms.max(1);
        Self::new((timeout_ms / interval_ms) as usize + 1, Duration::from_millis(interval_ms))
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout_ms(&self) -> u64 {
        self.interval.as_millis() as u64 * (self.attempts as u64 - 1)
    }

    /// Delays between attempts; the first attempt runs immediately.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.interval).take(self.attempts - 1)
    }
}

enum PollError {
    NotReady,
    Failed(AppError),
}

/// Run `check` until it yields a value or the policy is exhausted.
///
/// `Ok(None)` from the check means "not yet" and is retried; an `Err` aborts
/// the wait immediately. Exhaustion is reported as [`AppError::StepTimeout`].
pub async fn poll_until<T, F, Fut>(step: &str, policy: PollPolicy, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let outcome = RetryIf::spawn(
        policy.strategy(),
        || {
            let attempt = check();
            async move {
                match attempt.await {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => Err(PollError::NotReady),
                    Err(err) => Err(PollError::Failed(err)),
                }
            }
        },
        |err: &PollError| matches!(err, PollError::NotReady),
    )
    .await;

    match outcome {
        Ok(value) => Ok(value),
        Err(PollError::NotReady) => {
            tracing::debug!("{} not ready after {} attempts", step, policy.attempts());
            Err(AppError::StepTimeout {
                step: step.to_string(),
                timeout_ms: policy.timeout_ms(),
            })
        }
        Err(PollError::Failed(err)) => Err(err),
    }
}
