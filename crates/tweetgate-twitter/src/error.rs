//! Platform error types and account-restriction classification.

use thiserror::Error;

/// Result type for Twitter operations.
pub type TwitterResult<T> = Result<T, TwitterError>;

/// Twitter API error codes that mean the calling account is throttled.
const RATE_LIMIT_ERROR_CODES: [i64; 2] = [88, 185];
/// Twitter API error codes that mean the calling account is suspended or locked.
const SUSPENSION_ERROR_CODES: [i64; 2] = [64, 326];

const SUSPENDED_MARKER: &str = "suspended";
const THROTTLED_MARKER: &str = "Twittering";

/// Errors returned by the platform client.
#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("oauth error: {0}")]
    OAuth(String),
    #[error("twitter api returned status {status}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("stream error: {0}")]
    Stream(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Account-level restriction signalled by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRestriction {
    RateLimited,
    Suspended,
}

impl AccountRestriction {
    /// Classifies a free-form error message by its legacy case-sensitive markers.
    pub fn from_message(message: &str) -> Option<Self> {
        if message.contains(SUSPENDED_MARKER) {
            Some(Self::Suspended)
        } else if message.contains(THROTTLED_MARKER) {
            Some(Self::RateLimited)
        } else {
            None
        }
    }
}

impl TwitterError {
    /// Returns the account restriction this error signals, if any.
    ///
    /// Only restrictions tied to the calling credential are reported; transport
    /// failures and malformed payloads return `None`.
    pub fn account_restriction(&self) -> Option<AccountRestriction> {
        match self {
            Self::Api {
                status,
                code,
                message,
            } => {
                if let Some(code) = code {
                    if SUSPENSION_ERROR_CODES.contains(code) {
                        return Some(AccountRestriction::Suspended);
                    }
                    if RATE_LIMIT_ERROR_CODES.contains(code) {
                        return Some(AccountRestriction::RateLimited);
                    }
                }
                if *status == 429 {
                    return Some(AccountRestriction::RateLimited);
                }
                AccountRestriction::from_message(message)
            }
            _ => None,
        }
    }
}
