//! Connection source for the reconnecting stream controller.

use async_trait::async_trait;

use crate::error::ChatResult;
use crate::sse::SseEventStream;

/// Opens one event-stream connection per call.
///
/// The reconnecting controller calls [`connect`](StreamSource::connect) every
/// time it enters the `Connecting` state, passing the last observed cursor.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Open a fresh connection that replays events after `after`.
    async fn connect(&self, after: Option<i64>) -> ChatResult<SseEventStream>;

    /// Human-readable target, used in log lines.
    fn describe(&self) -> String {
        "event stream".to_string()
    }
}
