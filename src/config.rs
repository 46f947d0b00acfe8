//! Client configuration: where the API lives, how long a request may take and
//! how often the heartbeat fires. Values are public; do not store secrets here.

use std::time::Duration;
use url::Url;

/// Default API base when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
/// Heartbeat period while a session is live.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
/// Per-request timeout applied to every HTTP call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    api_base_url: Url,
    request_timeout: Duration,
    heartbeat_interval: Duration,
}

impl ClientConfig {
    /// Config for the given API base with default timeout and heartbeat period.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Parses `base` and builds a default config around it.
    ///
    /// # Errors
    /// Returns an error if `base` is not an absolute URL.
    pub fn parse(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(base.trim())?))
    }

    #[must_use]
    pub fn with_request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.request_timeout = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Replaces zero durations with their defaults.
    #[must_use]
    pub fn normalize(self) -> Self {
        let request_timeout = if self.request_timeout.is_zero() {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            self.request_timeout
        };
        let heartbeat_interval = if self.heartbeat_interval.is_zero() {
            DEFAULT_HEARTBEAT_INTERVAL
        } else {
            self.heartbeat_interval
        };

        Self {
            api_base_url: self.api_base_url,
            request_timeout,
            heartbeat_interval,
        }
    }

    #[must_use]
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Builds an absolute endpoint URL from the configured base and `path`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        build_url_with_base(self.api_base_url.as_str(), path)
    }
}

fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}
