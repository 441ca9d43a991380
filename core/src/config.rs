//! Client configuration.
//!
//! # Design
//! The API root, the request timeout and the poll interval are values
//! injected at construction so tests can point a client at a local mock
//! and poll without real multi-second sleeps. Credentials are supplied by
//! the caller; this crate does not read them from the environment.

use std::fmt;
use std::time::Duration;

use crate::poll::MIN_INTERVAL;

/// Versioned API root of the production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.upcloud.com/1.3";

/// Timeout applied to each HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sleep between state checks while waiting on a server.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Username and password for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Point at another API root; a trailing slash is dropped.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Intervals below `poll::MIN_INTERVAL` are raised to it.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_INTERVAL);
        self
    }
}
