//! High-level client for the chat service.
//!
//! [`ChatClient`] ties the pieces together: it builds URLs from the
//! configured base, resolves room names through a shared [`RoomResolver`],
//! sends requests through the [`Transport`], and opens one-shot or
//! reconnecting event streams.
//!
//! # Example
//!
//! ```ignore
//! use agent_chat::{ChatClient, ClientConfig, StreamOptions};
//!
//! let client = ChatClient::new(ClientConfig::from_env().with_sender("build-bot"));
//! client.send("general", "build finished").await?;
//!
//! let mut events = client.open_resilient_stream("general", StreamOptions::default());
//! while let Some(event) = events.next_event().await {
//!     println!("{}: {}", event.event_type, event.raw);
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::adapters::{ReqwestHttpClient, TokioSleeper};
use crate::config::ClientConfig;
use crate::error::{ChatError, ChatResult};
use crate::models::{Message, MessageQuery, NewMessage, Room};
use crate::resolver::RoomResolver;
use crate::sse::SseEventStream;
use crate::stream::{ResilientStream, StreamOptions};
use crate::traits::{Headers, HttpClient, Method, Sleeper, StreamSource};
use crate::transport::{Payload, Transport};

/// Client for one chat service. Clones share the room cache.
#[derive(Clone)]
pub struct ChatClient {
    config: Arc<ClientConfig>,
    transport: Transport,
    rooms: Arc<RoomResolver>,
    sleeper: Arc<dyn Sleeper>,
}

impl ChatClient {
    /// Create a client backed by reqwest.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Default configuration pointed at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::new(ClientConfig::default().with_base_url(base_url))
    }

    /// Configuration read from `CHAT_URL`, `CHAT_SENDER` and
    /// `CHAT_SENDER_TYPE`.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    /// Create a client with a custom HTTP implementation.
    pub fn with_http_client(config: ClientConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            config: Arc::new(config),
            transport: Transport::new(http),
            rooms: Arc::new(RoomResolver::new()),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the timer used between reconnect attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared room name cache.
    pub fn rooms(&self) -> &RoomResolver {
        &self.rooms
    }

    /// Absolute URL for `path`, with `params` appended as a query string.
    pub fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.config.base_url, path);
        if !params.is_empty() {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    /// Send one request to `path` using the configured timeout.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
        headers: Option<&Headers>,
        raw: bool,
    ) -> ChatResult<Payload> {
        let url = self.url(path, params);
        self.transport
            .request(method, &url, body, headers, self.config.timeout, raw)
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> ChatResult<T> {
        self.request(Method::Get, path, params, None, None, false)
            .await?
            .json()
    }

    async fn write<T: DeserializeOwned>(&self, method: Method, path: &str, body: &Value) -> ChatResult<T> {
        self.request(method, path, &[], Some(body), None, false)
            .await?
            .json()
    }

    fn sender_or_default(&self, sender: Option<&str>) -> ChatResult<String> {
        sender
            .or(self.config.sender.as_deref())
            .map(str::to_string)
            .ok_or_else(|| {
                ChatError::invalid_argument(
                    "sender is required (pass it or set a default in ClientConfig)",
                )
            })
    }

    // ---------------------------------------------------------------------
    // Rooms
    // ---------------------------------------------------------------------

    /// Resolve a room name or id to an id.
    pub async fn resolve_room(&self, room: &str) -> ChatResult<String> {
        self.rooms.resolve(room, || self.room_listing()).await
    }

    async fn room_listing(&self) -> ChatResult<Vec<(String, String)>> {
        let rooms: Vec<Room> = self
            .get("/api/v1/rooms", &[("include_archived", "true".to_string())])
            .await?;
        Ok(rooms.into_iter().map(|room| (room.name, room.id)).collect())
    }

    /// `GET /api/v1/health`
    pub async fn health(&self) -> ChatResult<Value> {
        self.get("/api/v1/health", &[]).await
    }

    /// `GET /api/v1/stats`
    pub async fn stats(&self) -> ChatResult<Value> {
        self.get("/api/v1/stats", &[]).await
    }

    /// List rooms. With a default sender the listing includes its bookmarks.
    pub async fn list_rooms(&self, include_archived: bool) -> ChatResult<Vec<Room>> {
        let mut params = Vec::new();
        if include_archived {
            params.push(("include_archived", "true".to_string()));
        }
        if let Some(sender) = &self.config.sender {
            params.push(("sender", sender.clone()));
        }
        self.get("/api/v1/rooms", &params).await
    }

    /// Create a room and remember its id. The returned room carries the
    /// admin key, which the server only reveals once.
    pub async fn create_room(&self, name: &str, description: &str) -> ChatResult<Room> {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(name));
        body.insert("description".to_string(), json!(description));
        if let Some(sender) = &self.config.sender {
            body.insert("created_by".to_string(), json!(sender));
        }

        let room: Room = self
            .write(Method::Post, "/api/v1/rooms", &Value::Object(body))
            .await?;
        self.rooms.insert(room.name.clone(), room.id.clone());
        Ok(room)
    }

    pub async fn get_room(&self, room: &str) -> ChatResult<Room> {
        let room_id = self.resolve_room(room).await?;
        self.get(&room_path(&room_id, ""), &[]).await
    }

    // ---------------------------------------------------------------------
    // Messages
    // ---------------------------------------------------------------------

    /// Send `content` as the default sender.
    pub async fn send(&self, room: &str, content: &str) -> ChatResult<Message> {
        self.send_message(room, NewMessage::new(content)).await
    }

    pub async fn send_message(&self, room: &str, message: NewMessage) -> ChatResult<Message> {
        let sender = self.sender_or_default(message.sender.as_deref())?;
        let room_id = self.resolve_room(room).await?;

        let mut body = Map::new();
        body.insert("sender".to_string(), json!(sender));
        body.insert("content".to_string(), json!(message.content));
        body.insert("sender_type".to_string(), json!(self.config.sender_type));
        if let Some(reply_to) = message.reply_to {
            body.insert("reply_to".to_string(), json!(reply_to));
        }
        if let Some(metadata) = message.metadata {
            body.insert("metadata".to_string(), metadata);
        }

        self.write(
            Method::Post,
            &room_path(&room_id, "/messages"),
            &Value::Object(body),
        )
        .await
    }

    /// Reply to `message_id` as the default sender.
    pub async fn reply(&self, room: &str, message_id: &str, content: &str) -> ChatResult<Message> {
        self.send_message(room, NewMessage::new(content).with_reply_to(message_id))
            .await
    }

    pub async fn get_messages(&self, room: &str, query: &MessageQuery) -> ChatResult<Vec<Message>> {
        let room_id = self.resolve_room(room).await?;
        self.get(&room_path(&room_id, "/messages"), &query.to_params())
            .await
    }

    /// Edit a message; the sender must match the original author.
    pub async fn edit_message(&self, room: &str, message_id: &str, content: &str) -> ChatResult<Message> {
        let sender = self.sender_or_default(None)?;
        let room_id = self.resolve_room(room).await?;
        let path = room_path(
            &room_id,
            &format!("/messages/{}", urlencoding::encode(message_id)),
        );
        self.write(Method::Put, &path, &json!({"sender": sender, "content": content}))
            .await
    }

    /// Delete a message as its sender, or as a moderator with `admin_key`.
    pub async fn delete_message(
        &self,
        room: &str,
        message_id: &str,
        admin_key: Option<&str>,
    ) -> ChatResult<()> {
        let room_id = self.resolve_room(room).await?;
        let path = room_path(
            &room_id,
            &format!("/messages/{}", urlencoding::encode(message_id)),
        );

        let (params, headers) = match admin_key {
            Some(key) => {
                let mut headers = Headers::new();
                headers.insert("Authorization".to_string(), format!("Bearer {}", key));
                (Vec::new(), Some(headers))
            }
            None => (vec![("sender", self.sender_or_default(None)?)], None),
        };

        self.request(Method::Delete, &path, &params, None, headers.as_ref(), false)
            .await?;
        Ok(())
    }

    pub async fn send_typing(&self, room: &str) -> ChatResult<()> {
        let sender = self.sender_or_default(None)?;
        let room_id = self.resolve_room(room).await?;
        self.request(
            Method::Post,
            &room_path(&room_id, "/typing"),
            &[],
            Some(&json!({"sender": sender})),
            None,
            false,
        )
        .await?;
        Ok(())
    }

    /// Messages after `last_seq`, plus the highest `seq` among them (or
    /// `last_seq` when there are none).
    pub async fn poll_new_messages(
        &self,
        room: &str,
        last_seq: i64,
        limit: u32,
    ) -> ChatResult<(Vec<Message>, i64)> {
        let messages = self
            .get_messages(room, &MessageQuery::after(last_seq).with_limit(limit))
            .await?;
        let newest = messages
            .iter()
            .filter_map(|m| m.seq)
            .fold(last_seq, i64::max);
        Ok((messages, newest))
    }

    // ---------------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------------

    pub async fn download_file(&self, file_id: &str) -> ChatResult<Bytes> {
        let path = format!("/api/v1/files/{}", urlencoding::encode(file_id));
        Ok(self
            .request(Method::Get, &path, &[], None, None, true)
            .await?
            .into_bytes())
    }

    // ---------------------------------------------------------------------
    // Streams
    // ---------------------------------------------------------------------

    /// Open a single connection to a room's event stream.
    ///
    /// Passing a sender (or having a default one) registers presence in the
    /// room. The stream ends when the connection does; use
    /// [`open_resilient_stream`](Self::open_resilient_stream) to reconnect.
    pub async fn open_stream(
        &self,
        room: &str,
        after: Option<i64>,
        sender: Option<&str>,
    ) -> ChatResult<SseEventStream> {
        let room_id = self.resolve_room(room).await?;

        let mut params = Vec::new();
        if let Some(after) = after {
            params.push(("after", after.to_string()));
        }
        if let Some(sender) = sender.or(self.config.sender.as_deref()) {
            params.push(("sender", sender.to_string()));
            params.push(("sender_type", self.config.sender_type.clone()));
        }

        let url = self.url(&room_path(&room_id, "/stream"), &params);
        debug!("Opening event stream {}", url);
        self.transport
            .open_stream(&url, None, self.config.stream_idle_timeout)
            .await
    }

    /// Follow a room's events across disconnects.
    ///
    /// Backoff bounds left unset in `options` come from [`ClientConfig`].
    ///
    /// Nothing is sent until the first call to
    /// [`next_event`](ResilientStream::next_event).
    pub fn open_resilient_stream(&self, room: &str, options: StreamOptions) -> ResilientStream {
        let source = RoomStreamSource {
            client: self.clone(),
            room: room.to_string(),
            sender: options.sender.clone(),
        };
        ResilientStream::new(
            Arc::new(source),
            self.sleeper.clone(),
            options.after,
            options.backoff_or(self.config.initial_backoff, self.config.max_backoff),
        )
    }

    /// [`StreamOptions`] seeded from this client's backoff settings.
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::new()
            .with_initial_backoff(self.config.initial_backoff)
            .with_max_backoff(self.config.max_backoff)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.config.base_url)
            .field("sender", &self.config.sender)
            .field("cached_rooms", &self.rooms.len())
            .finish()
    }
}

fn room_path(room_id: &str, suffix: &str) -> String {
    format!("/api/v1/rooms/{}{}", urlencoding::encode(room_id), suffix)
}

/// Reconnects to one room through a [`ChatClient`].
struct RoomStreamSource {
    client: ChatClient,
    room: String,
    sender: Option<String>,
}

#[async_trait]
impl StreamSource for RoomStreamSource {
    async fn connect(&self, after: Option<i64>) -> ChatResult<SseEventStream> {
        self.client
            .open_stream(&self.room, after, self.sender.as_deref())
            .await
    }

    fn describe(&self) -> String {
        format!("room '{}'", self.room)
    }
}
