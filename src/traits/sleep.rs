//! Timer abstraction for reconnect backoff.

use async_trait::async_trait;
use std::time::Duration;

/// Suspends the current task for a backoff delay.
///
/// Production code uses [`TokioSleeper`](crate::adapters::TokioSleeper);
/// tests inject [`RecordingSleeper`](crate::adapters::mock::RecordingSleeper)
/// to observe delays without waiting for them.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
