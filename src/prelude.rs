//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use agent_chat::prelude::*;
//! ```
//!
//! This will import:
//! - The client and its configuration (ChatClient, ClientConfig)
//! - Error types (ChatError, ChatResult)
//! - Model types (Room, Message, NewMessage, MessageQuery)
//! - Stream types (StreamEvent, StreamEventKind, ResilientStream, StreamOptions)

pub use crate::client::ChatClient;
pub use crate::config::ClientConfig;
pub use crate::error::{ChatError, ChatResult};
pub use crate::models::{Message, MessageQuery, NewMessage, Room};
pub use crate::sse::{SseEventStream, StreamEvent, StreamEventKind};
pub use crate::stream::{ConnectionState, ResilientStream, StreamOptions};
