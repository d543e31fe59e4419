//! Turns an HTTP body into a sequence of [`StreamEvent`]s.

use bytes::BytesMut;
use futures::Stream;
use futures_util::StreamExt;
use std::fmt;
use std::time::Duration;

use super::events::StreamEvent;
use super::parser::SseParser;
use crate::error::{ChatError, ChatResult, HttpError};
use crate::traits::ByteStream;

/// Longest line accepted before the stream is failed.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Events read from one open stream connection.
///
/// Not restartable: once the body ends or fails, every further call to
/// [`next_event`](SseEventStream::next_event) returns `Ok(None)`. Dropping
/// the value releases the connection.
///
/// `next_event` is cancel-safe. Bytes already received stay buffered, so
/// racing it against another future in `tokio::select!` loses nothing.
pub struct SseEventStream {
    body: ByteStream,
    parser: SseParser,
    /// Bytes received but not yet split into lines
    buffer: BytesMut,
    /// Prefix of `buffer` already known to hold no LF
    scanned: usize,
    max_line_length: usize,
    idle_timeout: Option<Duration>,
    finished: bool,
}

impl SseEventStream {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            parser: SseParser::new(),
            buffer: BytesMut::new(),
            scanned: 0,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            idle_timeout: None,
            finished: false,
        }
    }

    /// Fail with a timeout error when no bytes arrive for `timeout`.
    ///
    /// The service sends a heartbeat every 15 seconds, so a connection that
    /// stays silent much longer than that is dead.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Fail the stream when a single line grows past `limit` bytes.
    pub fn with_max_line_length(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self
    }

    /// Next event, or `Ok(None)` at end of stream.
    pub async fn next_event(&mut self) -> ChatResult<Option<StreamEvent>> {
        loop {
            while let Some(line) = self.take_line() {
                if let Some(event) = self.parser.feed_line(&line) {
                    return Ok(Some(event));
                }
            }

            if self.finished {
                return Ok(None);
            }
            if self.buffer.len() > self.max_line_length {
                self.finish();
                return Err(ChatError::network(HttpError::Io(format!(
                    "event-stream line exceeds {} bytes",
                    self.max_line_length
                ))));
            }

            let next = match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.body.next()).await {
                    Ok(item) => item,
                    Err(_) => {
                        self.finish();
                        return Err(ChatError::network(HttpError::Timeout(format!(
                            "no data received for {}s",
                            limit.as_secs_f64()
                        ))));
                    }
                },
                None => self.body.next().await,
            };

            match next {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    self.finish();
                    return Err(ChatError::network(err));
                }
                None => {
                    if !self.buffer.is_empty() || self.parser.has_pending() {
                        tracing::debug!("Stream ended inside a record, dropping partial event");
                    }
                    self.finish();
                    return Ok(None);
                }
            }
        }
    }

    /// Adapt into a `futures::Stream` that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = ChatResult<StreamEvent>> + Send {
        futures::stream::unfold(self, |mut events| async move {
            match events.next_event().await {
                Ok(Some(event)) => Some((Ok(event), events)),
                Ok(None) => None,
                Err(err) => Some((Err(err), events)),
            }
        })
    }

    /// Pop one complete line off the buffer, without its LF or CRLF.
    fn take_line(&mut self) -> Option<String> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let end = self.scanned + offset;
        let line = self.buffer.split_to(end + 1);
        self.scanned = 0;

        let text = &line[..end];
        let text = text.strip_suffix(b"\r").unwrap_or(text);
        Some(String::from_utf8_lossy(text).into_owned())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.buffer.clear();
        self.scanned = 0;
        self.parser.reset();
    }
}

impl fmt::Debug for SseEventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseEventStream")
            .field("buffered", &self.buffer.len())
            .field("idle_timeout", &self.idle_timeout)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
