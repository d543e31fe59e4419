//! Wire models for the chat service's REST API.
//!
//! Fields the client does not model are kept in `extra` so nothing the
//! server sends is lost.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Helper to deserialize id as either string or integer
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// A chat room as returned by the room endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub archived_at: Option<String>,
    /// Returned once, on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
    /// Stats and any other fields the server adds
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A message in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub room_id: String,
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub sender_type: Option<String>,
    /// Position in the room's event log
    #[serde(default)]
    pub seq: Option<i64>,
    #[serde(default)]
    pub pinned_at: Option<String>,
    #[serde(default)]
    pub pinned_by: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a new message; the sender falls back to the client's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMessage {
    pub content: String,
    pub sender: Option<String>,
    pub reply_to: Option<String>,
    pub metadata: Option<Value>,
}

impl NewMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Filters for listing a room's messages.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageQuery {
    /// Only messages with `seq` greater than this
    pub after: Option<i64>,
    /// Only messages with `seq` less than this
    pub before_seq: Option<i64>,
    /// Only messages created at or after this timestamp
    pub since: Option<String>,
    pub limit: u32,
    /// The N most recent messages; ignored when `after` or `before_seq` is set
    pub latest: Option<u32>,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            after: None,
            before_seq: None,
            since: None,
            limit: 50,
            latest: None,
        }
    }
}

impl MessageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(seq: i64) -> Self {
        Self {
            after: Some(seq),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_before_seq(mut self, seq: i64) -> Self {
        self.before_seq = Some(seq);
        self
    }

    pub fn with_since(mut self, timestamp: impl Into<String>) -> Self {
        self.since = Some(timestamp.into());
        self
    }

    pub fn with_latest(mut self, count: u32) -> Self {
        self.latest = Some(count);
        self
    }

    /// Query parameters in a stable order.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(after) = self.after {
            params.push(("after", after.to_string()));
        }
        if let Some(before) = self.before_seq {
            params.push(("before_seq", before.to_string()));
        }
        if let Some(since) = &self.since {
            params.push(("since", since.clone()));
        }
        if let Some(latest) = self.latest {
            params.push(("latest", latest.to_string()));
        }
        params
    }
}
