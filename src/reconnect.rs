//! Backoff decisions for failed connection attempts.
//!
//! The policy never sleeps or connects by itself. The registry feeds it the
//! retry state after every failed attempt and acts on the answer.
//!
//! ```
//! use cache_shell::reconnect::ReconnectPolicy;
//! use std::time::Duration;
//!
//! let policy = ReconnectPolicy::default();
//! assert_eq!(policy.delay_for(1), Duration::from_millis(100));
//! assert_eq!(policy.delay_for(50), Duration::from_millis(3000));
//! ```

use crate::error::Error;
use std::time::Duration;

/// Delay added per failed attempt.
pub const DELAY_STEP: Duration = Duration::from_millis(100);

/// Upper bound on a single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_millis(3000);

/// Attempt count past which every retry is logged as a milestone.
pub const ATTEMPT_MILESTONE: u32 = 10;

/// Total retry time past which every retry is logged as a milestone.
pub const RETRY_TIME_MILESTONE: Duration = Duration::from_secs(15);

/// Linear backoff with a ceiling and optional hard limits.
///
/// With both limits set to `None` the policy retries forever.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub step: Duration,
    pub ceiling: Duration,
    /// Give up once this many attempts have failed.
    pub max_attempts: Option<u32>,
    /// Give up once this much time has been spent retrying.
    pub max_retry_time: Option<Duration>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            step: DELAY_STEP,
            ceiling: MAX_DELAY,
            max_attempts: Some(ATTEMPT_MILESTONE),
            max_retry_time: Some(RETRY_TIME_MILESTONE),
        }
    }
}

impl ReconnectPolicy {
    /// Policy without attempt or time limits.
    pub fn unbounded() -> Self {
        ReconnectPolicy {
            max_attempts: None,
            max_retry_time: None,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_max_retry_time(mut self, limit: Option<Duration>) -> Self {
        self.max_retry_time = limit;
        self
    }

    /// Delay before the next attempt: `min(attempt * step, ceiling)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.ceiling)
    }

    /// Compute the delay after a failed attempt, logging retry milestones.
    ///
    /// The result depends only on `attempt`; the error and elapsed time are
    /// inspected for logging.
    pub fn next_delay(&self, error: &Error, attempt: u32, total_retry_time: Duration) -> Duration {
        if error.is_connection_refused() {
            info!("Reconnect: connection refused ({})", error);
        }

        if total_retry_time > RETRY_TIME_MILESTONE {
            info!(
                "Reconnect: retry time exhausted ({:?} spent retrying)",
                total_retry_time
            );
        }

        if attempt > ATTEMPT_MILESTONE {
            info!("Reconnect: {} attempts done", ATTEMPT_MILESTONE);
        }

        let delay = self.delay_for(attempt);
        info!("Reconnect: attempting connection in {:?}", delay);
        delay
    }

    /// Whether the configured limits forbid another attempt.
    pub fn is_exhausted(&self, attempts: u32, total_retry_time: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self
                .max_retry_time
                .is_some_and(|limit| total_retry_time >= limit)
    }
}
