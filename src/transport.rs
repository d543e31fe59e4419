//! One-shot HTTP requests against the chat service.
//!
//! [`Transport`] sends a single request through an [`HttpClient`] and maps
//! every outcome onto [`ChatResult`]: 2xx bodies are decoded into a
//! [`Payload`], anything else becomes the matching [`ChatError`] variant.
//! It never retries.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::sse::SseEventStream;
use crate::traits::{ByteStream, Headers, HttpClient, HttpRequest, Method, Response};

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `Content-Type` mentioned `json`; an empty body decodes to `Null`
    Json(Value),
    /// Any other content type (CSV, markdown, plain text)
    Text(String),
    /// The caller asked for the raw body
    Bytes(Bytes),
}

impl Payload {
    /// The payload as a JSON value. Text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
            Payload::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// Deserialize into a typed model.
    ///
    /// A body of the wrong shape is a `Generic` error with status 0 that keeps
    /// the body for inspection.
    pub fn json<T: DeserializeOwned>(self) -> ChatResult<T> {
        let value = self.into_json();
        T::deserialize(&value).map_err(|e| {
            ChatError::decode(0, format!("Unexpected response body: {}", e), value.clone())
        })
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Payload::Json(value) => Bytes::from(value.to_string()),
            Payload::Text(text) => Bytes::from(text),
            Payload::Bytes(bytes) => bytes,
        }
    }

    /// Text body, if the response was not JSON.
    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Stateless request executor; cheap to clone and share.
#[derive(Clone)]
pub struct Transport {
    http: Arc<dyn HttpClient>,
}

impl Transport {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Perform one request.
    ///
    /// `body` is sent as UTF-8 JSON with `Content-Type: application/json`
    /// unless `headers` already sets a content type. With `raw` the body is
    /// returned untouched.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: Option<&Headers>,
        timeout: Duration,
        raw: bool,
    ) -> ChatResult<Payload> {
        let mut request = HttpRequest::new(method, url).with_timeout(timeout);
        if let Some(headers) = headers {
            request = request.with_headers(headers);
        }
        if let Some(body) = body {
            let encoded = serde_json::to_vec(body).map_err(|e| {
                ChatError::invalid_argument(format!("Could not encode request body: {}", e))
            })?;
            if !request.has_header("content-type") {
                request = request.with_header("Content-Type", "application/json");
            }
            request = request.with_body(encoded);
        }

        debug!("{} {}", method, url);
        let response = self.http.send(request).await.map_err(ChatError::network)?;

        if !response.is_success() {
            debug!("{} {} failed with HTTP {}", method, url, response.status);
            return Err(classify(
                response.status,
                response.header("retry-after"),
                &response.body,
                url,
            ));
        }

        decode_success(response, raw)
    }

    /// Open an event stream with `GET url`.
    ///
    /// A non-2xx status is read to the end and mapped like any other failed
    /// request. `idle_timeout` bounds how long the stream may stay silent.
    pub async fn open_stream(
        &self,
        url: &str,
        headers: Option<&Headers>,
        idle_timeout: Option<Duration>,
    ) -> ChatResult<SseEventStream> {
        let mut request = HttpRequest::get(url).with_header("Accept", "text/event-stream");
        if let Some(headers) = headers {
            request = request.with_headers(headers);
        }

        let response = self
            .http
            .open_stream(request)
            .await
            .map_err(ChatError::network)?;

        if !response.is_success() {
            let retry_after = response.header("retry-after").map(str::to_string);
            let status = response.status;
            let body = read_to_end(response.body).await;
            return Err(classify(status, retry_after.as_deref(), &body, url));
        }

        let events = SseEventStream::new(response.body);
        Ok(match idle_timeout {
            Some(limit) => events.with_idle_timeout(limit),
            None => events,
        })
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

fn decode_success(response: Response, raw: bool) -> ChatResult<Payload> {
    if raw {
        return Ok(Payload::Bytes(response.body));
    }

    let is_json = response
        .header("content-type")
        .map(|ct| ct.contains("json"))
        .unwrap_or(false);

    if !is_json {
        return Ok(Payload::Text(
            String::from_utf8_lossy(&response.body).into_owned(),
        ));
    }
    if response.body.is_empty() {
        return Ok(Payload::Json(Value::Null));
    }

    serde_json::from_slice(&response.body)
        .map(Payload::Json)
        .map_err(|e| {
            ChatError::decode(
                response.status,
                format!("Invalid JSON in response: {}", e),
                Value::String(String::from_utf8_lossy(&response.body).into_owned()),
            )
        })
}

/// Map a failed response onto the error taxonomy.
fn classify(status: u16, retry_after: Option<&str>, body: &[u8], url: &str) -> ChatError {
    let text = String::from_utf8_lossy(body);
    let body = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned()));
    let retry_after = retry_after.and_then(|v| v.trim().parse::<f64>().ok());
    ChatError::from_response(status, body, retry_after, url)
}

/// Collect an error body. A read failure keeps what arrived so far.
async fn read_to_end(mut body: ByteStream) -> Vec<u8> {
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(err) => {
                debug!("Error body truncated: {}", err);
                break;
            }
        }
    }
    buf
}
