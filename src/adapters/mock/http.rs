//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that returns predefined
//! responses, streams, or errors, and records every request it receives.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::traits::{Headers, HttpClient, HttpError, HttpRequest, Response, StreamingResponse};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method ("GET", "POST", ...)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body, if any
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a complete response (any status)
    Success(Response),
    /// Fail before any response is received
    Error(HttpError),
    /// Return a streaming 200 response with these chunks, then end
    Stream(Vec<Bytes>),
    /// Return a streaming 200 response with these chunks, then fail
    StreamThenError(Vec<Bytes>, HttpError),
}

impl MockResponse {
    /// 200 response with a JSON body.
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        MockResponse::Success(Response::with_headers(
            status,
            headers,
            Bytes::from(value.to_string()),
        ))
    }

    /// Event stream whose body is `text`, delivered in one chunk.
    pub fn sse(text: &str) -> Self {
        MockResponse::Stream(vec![Bytes::from(text.to_string())])
    }
}

/// Mock HTTP client for testing.
///
/// Responses are registered per URL and matched exactly first, then by
/// prefix. Several responses pushed for the same URL are served in order,
/// and the last one keeps being served once the queue is down to it, which
/// makes it easy to script a sequence of connections.
///
/// # Example
///
/// ```ignore
/// use agent_chat::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.push_response("http://mock/api/v1/rooms/r1/stream", MockResponse::sse("event: message\ndata: {}\n\n"));
/// client.push_response("http://mock/api/v1/rooms/r1/stream", MockResponse::Error(HttpError::ConnectionFailed("down".into())));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Configured response queues by URL pattern
    responses: Arc<Mutex<Vec<(String, VecDeque<MockResponse>)>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the only response for a URL, replacing any queued ones.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.retain(|(pattern, _)| pattern != url);
        responses.push((url.to_string(), VecDeque::from([response])));
    }

    /// Queue another response for a URL.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        match responses.iter_mut().find(|(pattern, _)| pattern == url) {
            Some((_, queue)) => queue.push_back(response),
            None => responses.push((url.to_string(), VecDeque::from([response]))),
        }
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().unwrap() = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose URL starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.get_requests()
            .into_iter()
            .filter(|r| r.url.starts_with(prefix))
            .collect()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, request: &HttpRequest) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method.as_str().to_string(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request
                .body
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        });
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();

        let index = responses
            .iter()
            .position(|(pattern, _)| pattern == url)
            .or_else(|| {
                responses
                    .iter()
                    .position(|(pattern, _)| url.starts_with(pattern.as_str()))
            });

        if let Some(index) = index {
            let queue = &mut responses[index].1;
            return if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
        }

        self.default_response.lock().unwrap().clone()
    }
}

fn chunk_stream(chunks: Vec<Bytes>, tail: Option<HttpError>) -> crate::traits::ByteStream {
    let items = chunks
        .into_iter()
        .map(Ok)
        .chain(tail.into_iter().map(Err))
        .collect::<Vec<_>>();
    Box::pin(futures::stream::iter(items))
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<Response, HttpError> {
        self.record_request(&request);

        match self.next_response(&request.url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Stream(_)) | Some(MockResponse::StreamThenError(..)) => Err(
                HttpError::Other("Stream response on non-stream request".to_string()),
            ),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }

    async fn open_stream(&self, request: HttpRequest) -> Result<StreamingResponse, HttpError> {
        self.record_request(&request);

        match self.next_response(&request.url) {
            Some(MockResponse::Stream(chunks)) => Ok(StreamingResponse::new(
                200,
                Headers::new(),
                chunk_stream(chunks, None),
            )),
            Some(MockResponse::StreamThenError(chunks, err)) => Ok(StreamingResponse::new(
                200,
                Headers::new(),
                chunk_stream(chunks, Some(err)),
            )),
            Some(MockResponse::Success(response)) => Ok(StreamingResponse::new(
                response.status,
                response.headers,
                chunk_stream(vec![response.body], None),
            )),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_send_with_response() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/test",
            MockResponse::Success(Response::new(200, Bytes::from("Hello"))),
        );

        let response = client
            .send(HttpRequest::get("https://example.com/test"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from("Hello"));

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "https://example.com/test");
    }

    #[tokio::test]
    async fn test_queued_responses_served_in_order() {
        let client = MockHttpClient::new();
        let url = "https://example.com/seq";
        client.push_response(url, MockResponse::json(200, serde_json::json!({"n": 1})));
        client.push_response(url, MockResponse::json(200, serde_json::json!({"n": 2})));

        let first = client.send(HttpRequest::get(url)).await.unwrap();
        let second = client.send(HttpRequest::get(url)).await.unwrap();
        let third = client.send(HttpRequest::get(url)).await.unwrap();

        assert_eq!(first.body, Bytes::from(r#"{"n":1}"#));
        assert_eq!(second.body, Bytes::from(r#"{"n":2}"#));
        // The last queued response is sticky
        assert_eq!(third.body, Bytes::from(r#"{"n":2}"#));
    }

    #[tokio::test]
    async fn test_prefix_match() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/api",
            MockResponse::Success(Response::new(200, Bytes::from("API response"))),
        );

        let response = client
            .send(HttpRequest::get("https://example.com/api/v1/rooms?x=1"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_open_stream_then_error() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/stream",
            MockResponse::StreamThenError(
                vec![Bytes::from("chunk1"), Bytes::from("chunk2")],
                HttpError::Io("reset".to_string()),
            ),
        );

        let response = client
            .open_stream(HttpRequest::get("https://example.com/stream"))
            .await
            .unwrap();
        assert!(response.is_success());

        let items: Vec<_> = response.body.collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Ok(Bytes::from("chunk1")));
        assert_eq!(items[2], Err(HttpError::Io("reset".to_string())));
    }

    #[tokio::test]
    async fn test_no_response_configured() {
        let client = MockHttpClient::new();
        let result = client
            .send(HttpRequest::get("https://example.com/missing"))
            .await;
        assert!(matches!(result, Err(HttpError::Other(_))));
    }

    #[tokio::test]
    async fn test_default_response() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::Success(Response::new(
            404,
            Bytes::from("Not Found"),
        )));

        let response = client
            .send(HttpRequest::get("https://example.com/anything"))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com",
            MockResponse::Success(Response::new(200, Bytes::from("Hello"))),
        );

        let cloned = client.clone();
        cloned
            .send(HttpRequest::get("https://example.com"))
            .await
            .unwrap();

        assert_eq!(client.get_requests().len(), 1);
        client.clear_requests();
        assert!(cloned.get_requests().is_empty());
    }
}
