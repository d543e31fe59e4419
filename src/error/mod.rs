//! Error handling for the chat client.
//!
//! Every fallible operation returns [`ChatResult`]. Failures are reported as a
//! single [`ChatError`] enum whose variants follow the service's HTTP status
//! taxonomy:
//!
//! | Variant | Produced by | Carries |
//! |---------|-------------|---------|
//! | `NotFound` | HTTP 404, unknown room name | message, body |
//! | `Conflict` | HTTP 409 | `error` field of the body, body |
//! | `RateLimit` | HTTP 429 | `retry_after_secs`, body |
//! | `Auth` | HTTP 401 / 403 | status, message, body |
//! | `Generic` | any other non-2xx, network failures, decode failures | status (0 for network), cause |
//!
//! # Example
//!
//! ```ignore
//! use agent_chat::error::ChatError;
//!
//! match client.send("general", "hello").await {
//!     Ok(msg) => println!("sent #{}", msg.seq),
//!     Err(ChatError::RateLimit { retry_after_secs, .. }) => {
//!         tokio::time::sleep(Duration::from_secs_f64(retry_after_secs)).await;
//!     }
//!     Err(err) => eprintln!("{} (HTTP {})", err, err.status_code()),
//! }
//! ```

mod chat_error;
mod network;
mod result;

pub use chat_error::ChatError;
pub use network::{classify_reqwest_error, HttpError};
pub use result::ChatResult;
