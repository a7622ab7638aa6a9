//! Wire types for the v1.1 REST and streaming endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Subscription parameters for `statuses/filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFilter {
    pub track: String,
    pub language: String,
}

impl StreamFilter {
    pub fn new(track: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            language: language.into(),
        }
    }

    pub(crate) fn form_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("track".to_string(), self.track.clone())];
        if !self.language.trim().is_empty() {
            params.push(("language".to_string(), self.language.clone()));
        }
        params
    }
}

/// A tweet as delivered by the stream or the mentions timeline.
///
/// Deserialization fails for events missing `id_str`, `text` or
/// `user.screen_name`; callers treat that as a malformed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamTweet {
    pub id_str: String,
    #[serde(alias = "full_text")]
    pub text: String,
    pub user: TweetAuthor,
    /// Embedded original tweet when this event is a retweet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweeted_status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<TweetEntities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl StreamTweet {
    pub fn author(&self) -> &str {
        &self.user.screen_name
    }

    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }

    pub fn has_media(&self) -> bool {
        self.entities
            .as_ref()
            .is_some_and(|entities| !entities.media.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetAuthor {
    pub screen_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_str: Option<String>,
}

/// Entity lists. A missing or `null` list reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetEntities {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub media: Vec<MediaEntity>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hashtags: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub urls: Vec<Value>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntity {
    #[serde(default)]
    pub id_str: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_url_https: Option<String>,
}

/// Account returned by `account/verify_credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterUser {
    pub id_str: String,
    pub screen_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub(crate) errors: Vec<ApiErrorEntry>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorEntry {
    #[serde(default)]
    pub(crate) code: Option<i64>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}
