//! Common test utilities for integration tests.
//!
//! Fixtures for pointing a [`ChatClient`] at a wiremock server and for
//! building event-stream bodies.
//!
//! # Example
//!
//! ```ignore
//! let server = MockServer::start().await;
//! let client = test_client(&server);
//! mount_room_listing(&server, &[("general", &test_room_id())]).await;
//! ```

use std::sync::Arc;

use agent_chat::adapters::mock::RecordingSleeper;
use agent_chat::{ChatClient, ClientConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A fresh room id in canonical form.
pub fn test_room_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Client pointed at `server` with a default sender.
pub fn test_client(server: &MockServer) -> ChatClient {
    ChatClient::new(
        ClientConfig::default()
            .with_base_url(server.uri())
            .with_sender("test-bot"),
    )
}

/// Client whose reconnect delays are recorded instead of slept.
#[allow(dead_code)]
pub fn test_client_with_sleeper(server: &MockServer) -> (ChatClient, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let client = test_client(server).with_sleeper(Arc::new(sleeper.clone()));
    (client, sleeper)
}

/// Serve `rooms` as the full room listing, expecting exactly `times` calls.
#[allow(dead_code)]
pub async fn mount_room_listing(server: &MockServer, rooms: &[(&str, &str)], times: u64) {
    let body: Vec<Value> = rooms
        .iter()
        .map(|(name, id)| json!({"id": id, "name": name, "description": ""}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/v1/rooms"))
        .and(query_param("include_archived", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Encode `(event type, payload)` pairs in SSE wire format.
#[allow(dead_code)]
pub fn sse_body(events: &[(&str, Value)]) -> String {
    events
        .iter()
        .map(|(event_type, data)| format!("event: {}\ndata: {}\n\n", event_type, data))
        .collect()
}

/// 200 response carrying an event-stream body.
#[allow(dead_code)]
pub fn sse_response(events: &[(&str, Value)]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(events), "text/event-stream")
}

/// A message payload as the server sends it.
#[allow(dead_code)]
pub fn message_json(room_id: &str, seq: i64, content: &str) -> Value {
    json!({
        "id": format!("msg-{}", seq),
        "room_id": room_id,
        "sender": "alice",
        "content": content,
        "metadata": {},
        "created_at": "2026-01-01T00:00:00Z",
        "sender_type": "human",
        "seq": seq
    })
}
