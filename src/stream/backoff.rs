//! Exponential backoff between reconnection attempts.

use std::time::Duration;

/// First reconnect delay unless configured otherwise.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Reconnect delay cap unless configured otherwise.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delay schedule for reconnects.
///
/// Each failure sleeps for the current delay, which then doubles up to the
/// cap. Any consumed event resets it to the base delay.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base delay (first retry)
    base_delay: Duration,
    /// Delay the next failure will sleep for
    current_delay: Duration,
    /// Maximum delay cap
    max_delay: Duration,
    /// Number of consecutive failures
    failure_count: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff with default settings.
    ///
    /// Default: 1s base, 30s max.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF)
    }

    /// Create a new backoff with custom settings.
    ///
    /// A base delay above the cap is clamped to the cap.
    pub fn with_config(base_delay: Duration, max_delay: Duration) -> Self {
        let base_delay = base_delay.min(max_delay);
        Self {
            base_delay,
            current_delay: base_delay,
            max_delay,
            failure_count: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay;
        self.failure_count = self.failure_count.saturating_add(1);
        self.current_delay = self.current_delay.saturating_mul(2).min(self.max_delay);
        delay
    }

    /// Return to the base delay and clear the failure count.
    pub fn reset(&mut self) {
        if self.failure_count > 0 {
            tracing::debug!(
                "Resetting backoff after {} failed attempts",
                self.failure_count
            );
        }
        self.failure_count = 0;
        self.current_delay = self.base_delay;
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}
