//! Agent Chat - async client for a local chat service
//!
//! Talks to the service's REST API and follows room event streams over
//! Server-Sent Events, reconnecting and resuming from the last seen `seq`
//! when the connection drops.

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod prelude;
pub mod resolver;
pub mod sse;
pub mod stream;
pub mod traits;
pub mod transport;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use error::{ChatError, ChatResult};
pub use sse::StreamEvent;
pub use stream::{ResilientStream, StreamOptions};
