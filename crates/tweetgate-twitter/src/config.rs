//! Endpoint and transport settings for the platform client.

use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE: &str = "https://api.twitter.com";
const DEFAULT_STREAM_BASE: &str = "https://stream.twitter.com";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Platform client configuration shared by every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_stream_base")]
    pub stream_base: String,
    /// Timeout applied to REST calls. The filtered stream is never timed out.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_stream_base() -> String {
    DEFAULT_STREAM_BASE.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_user_agent() -> String {
    format!("tweetgate/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            stream_base: default_stream_base(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl TwitterConfig {
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    pub(crate) fn stream_url(&self, path: &str) -> String {
        format!("{}{}", self.stream_base.trim_end_matches('/'), path)
    }
}
