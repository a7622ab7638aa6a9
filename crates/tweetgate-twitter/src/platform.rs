//! Platform seam consumed by the runtime, plus the per-account client handed
//! to reactions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::TwitterRestClient;
use crate::credentials::{Credential, VerifiedCredential};
use crate::error::TwitterResult;
use crate::stream::{self, TweetStream};
use crate::types::{StreamFilter, StreamTweet, TwitterUser};

#[async_trait]
/// Trait contract for the platform operations tweetgate issues.
pub trait TwitterPlatform: Send + Sync {
    async fn verify_credentials(&self, credential: &Credential) -> TwitterResult<TwitterUser>;

    async fn open_filtered_stream(
        &self,
        credential: &Credential,
        filter: &StreamFilter,
    ) -> TwitterResult<TweetStream>;

    async fn mentions_timeline(
        &self,
        credential: &Credential,
        count: u32,
    ) -> TwitterResult<Vec<StreamTweet>>;

    async fn retweet(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()>;

    async fn favorite(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()>;
}

#[async_trait]
impl TwitterPlatform for TwitterRestClient {
    async fn verify_credentials(&self, credential: &Credential) -> TwitterResult<TwitterUser> {
        TwitterRestClient::verify_credentials(self, credential).await
    }

    async fn open_filtered_stream(
        &self,
        credential: &Credential,
        filter: &StreamFilter,
    ) -> TwitterResult<TweetStream> {
        stream::open_filtered_stream(self, credential, filter).await
    }

    async fn mentions_timeline(
        &self,
        credential: &Credential,
        count: u32,
    ) -> TwitterResult<Vec<StreamTweet>> {
        TwitterRestClient::mentions_timeline(self, credential, count).await
    }

    async fn retweet(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()> {
        TwitterRestClient::retweet(self, credential, tweet_id).await
    }

    async fn favorite(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()> {
        TwitterRestClient::favorite(self, credential, tweet_id).await
    }
}

/// Platform access bound to one verified account.
#[derive(Clone)]
pub struct AccountClient {
    platform: Arc<dyn TwitterPlatform>,
    account: VerifiedCredential,
}

impl AccountClient {
    pub fn new(platform: Arc<dyn TwitterPlatform>, account: VerifiedCredential) -> Self {
        Self { platform, account }
    }

    pub fn screen_name(&self) -> &str {
        &self.account.screen_name
    }

    pub fn account(&self) -> &VerifiedCredential {
        &self.account
    }

    pub async fn retweet(&self, tweet_id: &str) -> TwitterResult<()> {
        self.platform
            .retweet(&self.account.credential, tweet_id)
            .await
    }

    pub async fn favorite(&self, tweet_id: &str) -> TwitterResult<()> {
        self.platform
            .favorite(&self.account.credential, tweet_id)
            .await
    }

    pub async fn mentions(&self, count: u32) -> TwitterResult<Vec<StreamTweet>> {
        self.platform
            .mentions_timeline(&self.account.credential, count)
            .await
    }
}

impl std::fmt::Debug for AccountClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountClient")
            .field("screen_name", &self.account.screen_name)
            .finish()
    }
}
