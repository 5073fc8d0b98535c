//! Runtime settings for the relay process (not the user's credentials).

use std::{path::PathBuf, time::Duration};

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Provider-side long wait for `getUpdates`.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

/// Headroom the HTTP client needs on top of the long wait.
const REQUEST_TIMEOUT_HEADROOM_SECS: u64 = 15;

/// Contents of `duplex.toml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplexSettings {
    /// Bot API root, without the `/bot<token>` suffix.
    pub api_base_url: String,

    pub poll_timeout_secs: u64,

    /// Must be longer than `poll_timeout_secs`, or the client aborts the
    /// held request before the provider answers.
    pub request_timeout_secs: u64,

    /// Pause after a failed poll round. 0 disables.
    pub failure_backoff_ms: u64,

    /// Where the store keeps its files. Defaults to the user data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Base URL that shareable links are appended to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_base_url: Option<String>,
}

impl Default for DuplexSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS + REQUEST_TIMEOUT_HEADROOM_SECS,
            failure_backoff_ms: 5_000,
            data_dir: None,
            share_base_url: None,
        }
    }
}

impl DuplexSettings {
    /// Fix up values that would break long polling.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.request_timeout_secs <= self.poll_timeout_secs {
            let fixed = self.poll_timeout_secs + REQUEST_TIMEOUT_HEADROOM_SECS;
            warn!(
                request_timeout_secs = self.request_timeout_secs,
                poll_timeout_secs = self.poll_timeout_secs,
                fixed,
                "request timeout must exceed poll timeout, raising it"
            );
            self.request_timeout_secs = fixed;
        }
        let trimmed = self.api_base_url.trim_end_matches('/').len();
        self.api_base_url.truncate(trimmed);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }
}
