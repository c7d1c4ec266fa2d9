//! Exponential backoff between verification attempts.
//!
//! The scheduler only computes and waits out delays; the orchestrator decides
//! whether another attempt is allowed.

use crate::config::BackoffConfig;
use std::time::Duration;
use tracing::debug;

/// Computes `min(max, 2^attempt * base)` delays and sleeps through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryScheduler {
    base: Duration,
    max: Duration,
}

impl RetryScheduler {
    /// Create a scheduler with the given base delay and ceiling.
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Build from configuration.
    #[must_use]
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_secs(config.base_secs),
            Duration::from_secs(config.max_secs),
        )
    }

    /// Delay before the next attempt, where `attempt` is the 1-based count of
    /// failures so far.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Suspend the caller for [`delay_for`](Self::delay_for)`(attempt)`.
    ///
    /// Only the calling task waits; other verifications keep running.
    pub async fn wait(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        debug!(
            attempt,
            delay_seconds = delay.as_secs(),
            "Applying retry delay"
        );
        tokio::time::sleep(delay).await;
        delay
    }
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}
