//! Reconnecting event streams.
//!
//! - `backoff` - Delay schedule between reconnect attempts
//! - `cursor` - Highest `seq` consumed, used to resume
//! - `controller` - The reconnecting state machine ([`ResilientStream`])

mod backoff;
mod controller;
mod cursor;

pub use backoff::{ExponentialBackoff, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};
pub use controller::{ConnectionState, ResilientStream, StreamOptions};
pub use cursor::Cursor;
