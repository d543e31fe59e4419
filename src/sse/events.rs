//! Event types produced by the stream parser.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Event type of the server's keep-alive records.
pub const HEARTBEAT_EVENT: &str = "heartbeat";

/// A single line of the SSE wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// `event: <type>` line
    Event(String),
    /// `data: <payload>` line
    Data(String),
    /// Blank line (record terminator)
    Empty,
    /// Comments, `id:`, `retry:` and anything else
    Other(String),
}

/// Event types the chat service emits on a room stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamEventKind {
    Message,
    MessageEdited,
    MessageDeleted,
    Typing,
    PresenceJoined,
    PresenceLeft,
    RoomUpdated,
    RoomArchived,
    RoomUnarchived,
    FileUploaded,
    FileDeleted,
    ReactionAdded,
    ReactionRemoved,
    MessagePinned,
    MessageUnpinned,
    ReadPositionUpdated,
    ProfileUpdated,
    ProfileDeleted,
    Heartbeat,
    /// Any event type this client does not know about
    Other(String),
}

impl StreamEventKind {
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            "message" => StreamEventKind::Message,
            "message_edited" => StreamEventKind::MessageEdited,
            "message_deleted" => StreamEventKind::MessageDeleted,
            "typing" => StreamEventKind::Typing,
            "presence_joined" => StreamEventKind::PresenceJoined,
            "presence_left" => StreamEventKind::PresenceLeft,
            "room_updated" => StreamEventKind::RoomUpdated,
            "room_archived" => StreamEventKind::RoomArchived,
            "room_unarchived" => StreamEventKind::RoomUnarchived,
            "file_uploaded" => StreamEventKind::FileUploaded,
            "file_deleted" => StreamEventKind::FileDeleted,
            "reaction_added" => StreamEventKind::ReactionAdded,
            "reaction_removed" => StreamEventKind::ReactionRemoved,
            "message_pinned" => StreamEventKind::MessagePinned,
            "message_unpinned" => StreamEventKind::MessageUnpinned,
            "read_position_updated" => StreamEventKind::ReadPositionUpdated,
            "profile_updated" => StreamEventKind::ProfileUpdated,
            "profile_deleted" => StreamEventKind::ProfileDeleted,
            HEARTBEAT_EVENT => StreamEventKind::Heartbeat,
            other => StreamEventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StreamEventKind::Message => "message",
            StreamEventKind::MessageEdited => "message_edited",
            StreamEventKind::MessageDeleted => "message_deleted",
            StreamEventKind::Typing => "typing",
            StreamEventKind::PresenceJoined => "presence_joined",
            StreamEventKind::PresenceLeft => "presence_left",
            StreamEventKind::RoomUpdated => "room_updated",
            StreamEventKind::RoomArchived => "room_archived",
            StreamEventKind::RoomUnarchived => "room_unarchived",
            StreamEventKind::FileUploaded => "file_uploaded",
            StreamEventKind::FileDeleted => "file_deleted",
            StreamEventKind::ReactionAdded => "reaction_added",
            StreamEventKind::ReactionRemoved => "reaction_removed",
            StreamEventKind::MessagePinned => "message_pinned",
            StreamEventKind::MessageUnpinned => "message_unpinned",
            StreamEventKind::ReadPositionUpdated => "read_position_updated",
            StreamEventKind::ProfileUpdated => "profile_updated",
            StreamEventKind::ProfileDeleted => "profile_deleted",
            StreamEventKind::Heartbeat => HEARTBEAT_EVENT,
            StreamEventKind::Other(name) => name,
        }
    }
}

/// One decoded record from a room's event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Event type, never empty
    pub event_type: String,
    /// Payload decoded as JSON, or the raw text as a JSON string when it is
    /// not valid JSON
    pub data: Value,
    /// Data lines joined by `\n`, exactly as received
    pub raw: String,
}

impl StreamEvent {
    /// Build an event, decoding `raw` strictly as JSON.
    pub fn new(event_type: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let data = serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw.clone()));
        Self {
            event_type: event_type.into(),
            data,
            raw,
        }
    }

    pub fn kind(&self) -> StreamEventKind {
        StreamEventKind::from_event_type(&self.event_type)
    }

    pub fn is_heartbeat(&self) -> bool {
        self.event_type == HEARTBEAT_EVENT
    }

    /// The integral `seq` field of an object payload.
    ///
    /// Non-object payloads, a missing field, or a non-integral value all
    /// yield `None`.
    pub fn seq(&self) -> Option<i64> {
        self.data.as_object()?.get("seq")?.as_i64()
    }

    /// Deserialize the payload into a typed model.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}
