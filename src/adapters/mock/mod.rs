//! Mock implementations for testing.
//!
//! - [`MockHttpClient`] - Scripted HTTP responses, streams, and failures
//! - [`RecordingSleeper`] - Records backoff delays and returns immediately

pub mod http;
pub mod sleep;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use sleep::RecordingSleeper;
