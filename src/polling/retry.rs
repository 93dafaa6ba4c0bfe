/*!
 * Bounded retry with exponential backoff for one-shot loads.
 */

use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::network::NetworkMonitor;
use crate::errors::ConsoleError;

/// How often and how patiently a load is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,
    /// Wait before the second attempt; doubles after each failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Run `load` until it succeeds or the policy is exhausted.
///
/// Stops early with `NetworkUnavailable` when `monitor` reports the network
/// as down after a failure. Otherwise the last error is returned once all
/// attempts are spent.
pub async fn load_with_retry<T, E, F, Fut>(
    mut load: F,
    policy: &RetryPolicy,
    monitor: &NetworkMonitor,
) -> Result<T, ConsoleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<ConsoleError> + Display,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match load().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Load succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !monitor.is_online() {
            warn!("Load failed while offline, not retrying: {}", error);
            return Err(ConsoleError::NetworkUnavailable(error.to_string()));
        }

        if attempt >= max_attempts {
            warn!("Load failed after {} attempts: {}", attempt, error);
            return Err(error.into());
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Load failed (attempt {}/{}), retrying in {:?}: {}",
            attempt, max_attempts, delay, error
        );
        tokio::time::sleep(delay).await;
    }
}

/// Await `future`, calling `notice` once if it is still pending after `after`
pub async fn with_slow_notice<F, N>(future: F, after: Duration, notice: N) -> F::Output
where
    F: Future,
    N: FnOnce(),
{
    tokio::pin!(future);

    tokio::select! {
        biased;
        output = &mut future => return output,
        _ = tokio::time::sleep(after) => notice(),
    }

    future.await
}
