//! Built-in validators and reactions selectable from service configuration.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tweetgate_store::EntityStore;
use tweetgate_twitter::{AccountClient, StreamTweet};

use crate::service::{ReactionError, TweetReaction, TweetValidator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidatorSpec {
    #[default]
    HasMedia,
    Always,
    TextContains { needles: Vec<String> },
}

impl ValidatorSpec {
    pub fn build(&self) -> Arc<dyn TweetValidator> {
        match self {
            Self::HasMedia => Arc::new(HasMediaValidator),
            Self::Always => Arc::new(AlwaysValidator),
            Self::TextContains { needles } => Arc::new(TextContainsValidator::new(needles)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionSpec {
    #[default]
    Retweet,
    Favorite,
}

impl ReactionSpec {
    pub fn build(self) -> Arc<dyn TweetReaction> {
        match self {
            Self::Retweet => Arc::new(RetweetReaction),
            Self::Favorite => Arc::new(FavoriteReaction),
        }
    }
}

/// Accepts tweets carrying at least one media entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasMediaValidator;

#[async_trait]
impl TweetValidator for HasMediaValidator {
    async fn validate(&self, tweet: &StreamTweet) -> bool {
        tweet.has_media()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysValidator;

#[async_trait]
impl TweetValidator for AlwaysValidator {
    async fn validate(&self, _tweet: &StreamTweet) -> bool {
        true
    }
}

/// Case-insensitive substring match against any configured needle.
#[derive(Debug, Clone, Default)]
pub struct TextContainsValidator {
    needles: Vec<String>,
}

impl TextContainsValidator {
    pub fn new(needles: &[String]) -> Self {
        Self {
            needles: needles
                .iter()
                .map(|needle| needle.trim().to_lowercase())
                .filter(|needle| !needle.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl TweetValidator for TextContainsValidator {
    async fn validate(&self, tweet: &StreamTweet) -> bool {
        let text = tweet.text.to_lowercase();
        self.needles.iter().any(|needle| text.contains(needle.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetweetReaction;

#[async_trait]
impl TweetReaction for RetweetReaction {
    async fn react(
        &self,
        account: &AccountClient,
        tweet: &StreamTweet,
        _store: &dyn EntityStore,
    ) -> Result<(), ReactionError> {
        account.retweet(&tweet.id_str).await.map_err(ReactionError::from)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FavoriteReaction;

#[async_trait]
impl TweetReaction for FavoriteReaction {
    async fn react(
        &self,
        account: &AccountClient,
        tweet: &StreamTweet,
        _store: &dyn EntityStore,
    ) -> Result<(), ReactionError> {
        account.favorite(&tweet.id_str).await.map_err(ReactionError::from)
    }
}
