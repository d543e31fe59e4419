//! Reconnecting stream controller.
//!
//! [`ResilientStream`] hides connection loss from its consumer. It walks a
//! small state machine:
//!
//! ```text
//! Connecting -> Streaming -> Interrupted -> BackingOff -> Connecting -> ...
//!                                                 any state -> Cancelled
//! ```
//!
//! Every reconnect passes the highest `seq` seen so far, so the server
//! replays exactly the events that were missed. Heartbeats are consumed but
//! never handed to the consumer.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::backoff::{ExponentialBackoff, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};
use super::cursor::Cursor;
use crate::sse::{SseEventStream, StreamEvent};
use crate::traits::{Sleeper, StreamSource};

/// Settings for [`ChatClient::open_resilient_stream`](crate::client::ChatClient::open_resilient_stream).
///
/// Unset backoff bounds fall back to the client's configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOptions {
    /// Resume after this `seq` on the first connection
    pub after: Option<i64>,
    /// Sender identity to register presence with; falls back to the client's
    pub sender: Option<String>,
    /// First reconnect delay
    pub initial_backoff: Option<Duration>,
    /// Reconnect delay cap
    pub max_backoff: Option<Duration>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_after(mut self, seq: i64) -> Self {
        self.after = Some(seq);
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    pub fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    /// Backoff for these options, using 1s/30s for unset bounds.
    pub fn backoff(&self) -> ExponentialBackoff {
        self.backoff_or(DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF)
    }

    /// Backoff for these options, using `initial` and `max` for unset bounds.
    pub fn backoff_or(&self, initial: Duration, max: Duration) -> ExponentialBackoff {
        ExponentialBackoff::with_config(
            self.initial_backoff.unwrap_or(initial),
            self.max_backoff.unwrap_or(max),
        )
    }
}

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Streaming,
    Interrupted,
    BackingOff,
    Cancelled,
}

enum Phase {
    Connecting,
    Streaming(SseEventStream),
    Interrupted(String),
    BackingOff(Duration),
    Cancelled,
}

/// Event sequence that survives disconnects.
///
/// [`next_event`](ResilientStream::next_event) only returns `None` after
/// cancellation. Transient failures of any kind are logged and retried.
pub struct ResilientStream {
    source: Arc<dyn StreamSource>,
    sleeper: Arc<dyn Sleeper>,
    cursor: Cursor,
    backoff: ExponentialBackoff,
    phase: Phase,
    cancel: CancellationToken,
}

impl ResilientStream {
    pub fn new(
        source: Arc<dyn StreamSource>,
        sleeper: Arc<dyn Sleeper>,
        after: Option<i64>,
        backoff: ExponentialBackoff,
    ) -> Self {
        Self {
            source,
            sleeper,
            cursor: Cursor::new(after),
            backoff,
            phase: Phase::Connecting,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop when `token` is cancelled instead of an internal token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Next non-heartbeat event, reconnecting as often as needed.
    ///
    /// Returns `None` once the stream has been cancelled.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if matches!(self.phase, Phase::Cancelled) {
            return None;
        }

        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            event = self.advance() => {
                if event.is_some() {
                    return event;
                }
            }
        }

        debug!("Stream for {} cancelled", self.source.describe());
        self.phase = Phase::Cancelled;
        None
    }

    async fn advance(&mut self) -> Option<StreamEvent> {
        loop {
            let next = match &mut self.phase {
                Phase::Connecting => {
                    let after = self.cursor.get();
                    match self.source.connect(after).await {
                        Ok(events) => {
                            info!(
                                "Connected to {} (after={:?})",
                                self.source.describe(),
                                after
                            );
                            Phase::Streaming(events)
                        }
                        Err(err) => Phase::Interrupted(format!("connect failed: {}", err)),
                    }
                }
                Phase::Streaming(events) => match events.next_event().await {
                    Ok(Some(event)) => {
                        self.backoff.reset();
                        if event.is_heartbeat() {
                            trace!("Heartbeat from {}", self.source.describe());
                            continue;
                        }
                        if self.cursor.observe(&event) {
                            trace!("Cursor advanced to {:?}", self.cursor.get());
                        }
                        return Some(event);
                    }
                    Ok(None) => Phase::Interrupted("stream ended".to_string()),
                    Err(err) => Phase::Interrupted(err.to_string()),
                },
                Phase::Interrupted(reason) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        "Stream for {} interrupted ({}), reconnecting in {:?} (attempt {})",
                        self.source.describe(),
                        reason,
                        delay,
                        self.backoff.failure_count()
                    );
                    Phase::BackingOff(delay)
                }
                Phase::BackingOff(delay) => {
                    self.sleeper.sleep(*delay).await;
                    Phase::Connecting
                }
                Phase::Cancelled => return None,
            };
            self.phase = next;
        }
    }

    /// Adapt into a `futures::Stream` that ends on cancellation.
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next_event().await.map(|event| (event, stream))
        })
    }

    /// `seq` the next reconnect would resume after.
    pub fn cursor(&self) -> Option<i64> {
        self.cursor.get()
    }

    pub fn state(&self) -> ConnectionState {
        match self.phase {
            Phase::Connecting => ConnectionState::Connecting,
            Phase::Streaming(_) => ConnectionState::Streaming,
            Phase::Interrupted(_) => ConnectionState::Interrupted,
            Phase::BackingOff(_) => ConnectionState::BackingOff,
            Phase::Cancelled => ConnectionState::Cancelled,
        }
    }

    /// Failed attempts since the last consumed event.
    pub fn consecutive_failures(&self) -> u32 {
        self.backoff.failure_count()
    }

    /// Token that stops this stream when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ResilientStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientStream")
            .field("target", &self.source.describe())
            .field("state", &self.state())
            .field("cursor", &self.cursor.get())
            .field("failures", &self.backoff.failure_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::RecordingSleeper;
    use crate::error::{ChatError, ChatResult, HttpError};
    use crate::traits::ByteStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Attempt {
        Fail,
        Events(&'static str),
        EventsThenError(&'static str),
    }

    /// Connection source driven by a fixed script. Once the script runs out
    /// every connection stays open and silent.
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<Attempt>>,
        afters: Mutex<Vec<Option<i64>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Attempt>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                afters: Mutex::new(Vec::new()),
            })
        }

        fn afters(&self) -> Vec<Option<i64>> {
            self.afters.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamSource for ScriptedSource {
        async fn connect(&self, after: Option<i64>) -> ChatResult<SseEventStream> {
            self.afters.lock().unwrap().push(after);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Attempt::Fail) => Err(ChatError::network(HttpError::ConnectionFailed(
                    "refused".to_string(),
                ))),
                Some(Attempt::Events(text)) => Ok(SseEventStream::new(body(vec![Ok(
                    Bytes::from_static(text.as_bytes()),
                )]))),
                Some(Attempt::EventsThenError(text)) => Ok(SseEventStream::new(body(vec![
                    Ok(Bytes::from_static(text.as_bytes())),
                    Err(HttpError::Io("connection reset".to_string())),
                ]))),
                None => Ok(SseEventStream::new(Box::pin(futures::stream::pending::<
                    Result<Bytes, HttpError>,
                >()))),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn body(items: Vec<Result<Bytes, HttpError>>) -> ByteStream {
        Box::pin(futures::stream::iter(items))
    }

    fn controller(source: Arc<ScriptedSource>, sleeper: &RecordingSleeper) -> ResilientStream {
        ResilientStream::new(
            source,
            Arc::new(sleeper.clone()),
            None,
            ExponentialBackoff::new(),
        )
    }

    #[tokio::test]
    async fn test_backoff_grows_then_resets_after_event() {
        let source = ScriptedSource::new(vec![
            Attempt::Fail,
            Attempt::Fail,
            Attempt::Fail,
            Attempt::Events("event: message\ndata: {\"seq\":1}\n\n"),
            Attempt::Fail,
            Attempt::Events("event: message\ndata: {\"seq\":2}\n\n"),
        ]);
        let sleeper = RecordingSleeper::new();
        let mut stream = controller(source.clone(), &sleeper);

        assert_eq!(stream.next_event().await.unwrap().seq(), Some(1));
        assert_eq!(sleeper.delay_secs(), vec![1, 2, 4]);

        assert_eq!(stream.next_event().await.unwrap().seq(), Some(2));
        // End of the first stream sleeps 1s, the failed connect 2s
        assert_eq!(sleeper.delay_secs(), vec![1, 2, 4, 1, 2]);
        assert_eq!(stream.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn test_reconnects_after_max_seq_seen() {
        let source = ScriptedSource::new(vec![
            Attempt::Events(
                "event: message\ndata: {\"seq\":5}\n\nevent: message\ndata: {\"seq\":7}\n\nevent: message\ndata: {\"seq\":6}\n\n",
            ),
            Attempt::Events("event: message\ndata: {\"seq\":9}\n\n"),
        ]);
        let sleeper = RecordingSleeper::new();
        let mut stream = controller(source.clone(), &sleeper);

        let mut seqs = Vec::new();
        for _ in 0..4 {
            seqs.push(stream.next_event().await.unwrap().seq().unwrap());
        }

        assert_eq!(seqs, vec![5, 7, 6, 9]);
        assert_eq!(source.afters(), vec![None, Some(7)]);
        assert_eq!(stream.cursor(), Some(9));
    }

    #[tokio::test]
    async fn test_starting_cursor_is_used_for_first_connect() {
        let source = ScriptedSource::new(vec![Attempt::Events(
            "event: message\ndata: {\"seq\":43}\n\n",
        )]);
        let sleeper = RecordingSleeper::new();
        let mut stream = ResilientStream::new(
            source.clone(),
            Arc::new(sleeper.clone()),
            Some(42),
            ExponentialBackoff::new(),
        );

        stream.next_event().await.unwrap();
        assert_eq!(source.afters(), vec![Some(42)]);
    }

    #[tokio::test]
    async fn test_heartbeats_are_suppressed() {
        let source = ScriptedSource::new(vec![Attempt::Events(
            "event: heartbeat\ndata: {\"time\":\"t1\"}\n\n\
             event: message\ndata: {\"seq\":1}\n\n\
             event: heartbeat\ndata: {\"time\":\"t2\"}\n\n\
             event: typing\ndata: {\"sender\":\"bob\"}\n\n",
        )]);
        let sleeper = RecordingSleeper::new();
        let mut stream = controller(source, &sleeper);

        let first = stream.next_event().await.unwrap();
        let second = stream.next_event().await.unwrap();
        assert_eq!(first.event_type, "message");
        assert_eq!(second.event_type, "typing");
        assert_eq!(stream.cursor(), Some(1));
    }

    #[tokio::test]
    async fn test_heartbeat_resets_backoff() {
        let source = ScriptedSource::new(vec![
            Attempt::Fail,
            Attempt::Fail,
            Attempt::Events("event: heartbeat\ndata: {}\n\n"),
            Attempt::Fail,
            Attempt::Events("event: message\ndata: {\"seq\":1}\n\n"),
        ]);
        let sleeper = RecordingSleeper::new();
        let mut stream = controller(source, &sleeper);

        stream.next_event().await.unwrap();
        assert_eq!(sleeper.delay_secs(), vec![1, 2, 1, 2]);
    }

    #[tokio::test]
    async fn test_mid_stream_error_resumes_from_cursor() {
        let source = ScriptedSource::new(vec![
            Attempt::EventsThenError("event: message\ndata: {\"seq\":5}\n\n"),
            Attempt::Events("event: message\ndata: {\"seq\":6}\n\n"),
        ]);
        let sleeper = RecordingSleeper::new();
        let mut stream = controller(source.clone(), &sleeper);

        assert_eq!(stream.next_event().await.unwrap().seq(), Some(5));
        assert_eq!(stream.next_event().await.unwrap().seq(), Some(6));
        assert_eq!(source.afters(), vec![None, Some(5)]);
        assert_eq!(sleeper.delay_secs(), vec![1]);
    }

    #[tokio::test]
    async fn test_backoff_respects_custom_cap() {
        let source = ScriptedSource::new(vec![
            Attempt::Fail,
            Attempt::Fail,
            Attempt::Fail,
            Attempt::Fail,
            Attempt::Events("event: message\ndata: {}\n\n"),
        ]);
        let sleeper = RecordingSleeper::new();
        let options = StreamOptions::new().with_max_backoff(Duration::from_secs(3));
        let mut stream =
            ResilientStream::new(source, Arc::new(sleeper.clone()), None, options.backoff());

        stream.next_event().await.unwrap();
        assert_eq!(sleeper.delay_secs(), vec![1, 2, 3, 3]);
    }

    #[tokio::test]
    async fn test_cancel_before_first_event() {
        let source = ScriptedSource::new(vec![]);
        let sleeper = RecordingSleeper::new();
        let mut stream = controller(source, &sleeper);

        stream.cancel();
        assert!(stream.next_event().await.is_none());
        assert_eq!(stream.state(), ConnectionState::Cancelled);
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_data() {
        let source = ScriptedSource::new(vec![]);
        let sleeper = RecordingSleeper::new();
        let token = CancellationToken::new();
        let mut stream = controller(source, &sleeper).with_cancellation(token.clone());

        let handle = tokio::spawn(async move {
            let event = stream.next_event().await;
            (event, stream.state())
        });
        tokio::task::yield_now().await;
        token.cancel();

        let (event, state) = handle.await.unwrap();
        assert!(event.is_none());
        assert_eq!(state, ConnectionState::Cancelled);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let source = ScriptedSource::new(vec![Attempt::Events(
            "event: message\ndata: {\"seq\":1}\n\nevent: message\ndata: {\"seq\":2}\n\n",
        )]);
        let sleeper = RecordingSleeper::new();
        let stream = controller(source, &sleeper);

        let seqs: Vec<_> = stream
            .into_stream()
            .take(2)
            .map(|e| e.seq())
            .collect()
            .await;
        assert_eq!(seqs, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_stream_options_builder() {
        let options = StreamOptions::new()
            .with_after(10)
            .with_sender("bot")
            .with_initial_backoff(Duration::from_millis(500))
            .with_max_backoff(Duration::from_secs(8));
        assert_eq!(options.after, Some(10));
        assert_eq!(options.sender.as_deref(), Some("bot"));
        assert_eq!(options.backoff().current_delay(), Duration::from_millis(500));
        assert_eq!(options.backoff().max_delay(), Duration::from_secs(8));
    }

    #[test]
    fn test_unset_backoff_bounds_use_fallback() {
        let options = StreamOptions::new().with_max_backoff(Duration::from_secs(8));
        let backoff = options.backoff_or(Duration::from_secs(5), Duration::from_secs(60));
        assert_eq!(backoff.current_delay(), Duration::from_secs(5));
        assert_eq!(backoff.max_delay(), Duration::from_secs(8));

        let defaults = StreamOptions::new().backoff();
        assert_eq!(defaults.current_delay(), Duration::from_secs(1));
        assert_eq!(defaults.max_delay(), Duration::from_secs(30));
    }
}
