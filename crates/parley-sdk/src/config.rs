//! Gateway client configuration.

use std::time::Duration;

/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "PARLEY_API_BASE_URL";

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5147";

/// Client-side limit on the health probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings, passed to the client at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,

    /// Timeout for `GET /health`.
    pub health_timeout: Duration,

    /// Timeout for every other request. `None` leaves it to the backend.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Defaults, with the base URL taken from `PARLEY_API_BASE_URL` when set.
    pub fn from_env() -> Self {
        Self::from_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    fn from_base_url_override(value: Option<String>) -> Self {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(url) => Self::new(url),
            None => Self::default(),
        }
    }

    /// Set the base URL; surrounding whitespace and trailing slashes are dropped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Absolute URL for a backend path such as `/health`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
