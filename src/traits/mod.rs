//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP request/response and streaming GET
//! - [`Sleeper`] - Backoff delays for the reconnecting stream
//! - [`StreamSource`] - Opens one event-stream connection for the controller

pub mod http;
pub mod sleep;
pub mod stream_source;

pub use http::{
    ByteStream, Headers, HttpClient, HttpError, HttpRequest, Method, Response, StreamingResponse,
};
pub use sleep::Sleeper;
pub use stream_source::StreamSource;
