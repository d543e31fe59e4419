//! SSE (Server-Sent Events) stream parsing
//!
//! Room streams use the standard wire format:
//! - `event: <type>` - event type line
//! - `data: <payload>` - data line, may repeat for multi-line payloads
//! - Empty line - signals end of event
//! - Anything else (`:` comments, `id:`, `retry:`) is ignored
//!
//! # Module structure
//! - `events` - Event types (StreamEvent, StreamEventKind, SseLine)
//! - `parser` - Line-level parsing (SseParser, parse_sse_line)
//! - `reader` - Byte stream to event sequence (SseEventStream)

mod events;
mod parser;
mod reader;

pub use events::{SseLine, StreamEvent, StreamEventKind, HEARTBEAT_EVENT};
pub use parser::{parse_sse_line, SseParser};
pub use reader::{SseEventStream, DEFAULT_MAX_LINE_LENGTH};
