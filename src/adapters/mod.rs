//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`TokioSleeper`] - Backoff delays on the tokio timer
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Scripted HTTP responses and streams
//! - [`mock::RecordingSleeper`] - Records backoff delays without waiting

pub mod mock;
pub mod reqwest_http;
pub mod tokio_sleep;

pub use mock::{MockHttpClient, RecordingSleeper};
pub use reqwest_http::ReqwestHttpClient;
pub use tokio_sleep::TokioSleeper;
