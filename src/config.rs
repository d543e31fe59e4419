//! Client configuration.

use std::time::Duration;

use crate::stream::{DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};

/// Default service URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3006";

/// Configuration for a [`ChatClient`](crate::client::ChatClient).
///
/// Use the builder pattern to customize the defaults.
///
/// # Example
///
/// ```ignore
/// use agent_chat::config::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_base_url("http://chat.internal:3006/")
///     .with_sender("build-bot")
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service URL without a trailing slash
    pub base_url: String,
    /// Default sender for messages and stream presence
    pub sender: Option<String>,
    /// Sender type reported with messages ("agent" or "human")
    pub sender_type: String,
    /// Timeout for one-shot requests (default: 15s)
    pub timeout: Duration,
    /// How long an event stream may stay silent before it counts as dead
    /// (default: 60s, four missed heartbeats)
    pub stream_idle_timeout: Option<Duration>,
    /// First reconnect delay for resilient streams (default: 1s)
    pub initial_backoff: Duration,
    /// Reconnect delay cap for resilient streams (default: 30s)
    pub max_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sender: None,
            sender_type: "agent".to_string(),
            timeout: Duration::from_secs(15),
            stream_idle_timeout: Some(Duration::from_secs(60)),
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `CHAT_URL`, `CHAT_SENDER` and
    /// `CHAT_SENDER_TYPE` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        if let Some(url) = non_empty("CHAT_URL") {
            config = config.with_base_url(url);
        }
        if let Some(sender) = non_empty("CHAT_SENDER") {
            config = config.with_sender(sender);
        }
        if let Some(sender_type) = non_empty("CHAT_SENDER_TYPE") {
            config = config.with_sender_type(sender_type);
        }
        config
    }

    /// Trailing slashes are stripped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_sender_type(mut self, sender_type: impl Into<String>) -> Self {
        self.sender_type = sender_type.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `None` lets a silent stream stay open forever.
    pub fn with_stream_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    pub fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }
}
