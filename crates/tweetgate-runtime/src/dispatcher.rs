//! Credential-failover action dispatcher.
//!
//! Every dispatch starts at the service's cursor. A rate-limited or
//! suspended account moves the cursor to the next account and the reaction
//! is retried there; any other failure abandons the tweet without touching
//! the cursor. Once every account in the pool has failed with a retryable
//! error for the same tweet the service is latched as exhausted, which ends
//! its subscription for the lifetime of the process.

use std::sync::Arc;

use tracing::{error, info, warn};
use tweetgate_store::{ActionRecord, EntityStore};
use tweetgate_twitter::{AccountClient, StreamTweet, TwitterPlatform};

use crate::service::{ReactionErrorKind, ServiceRuntime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The reaction succeeded on `account` after `attempts` tries.
    Succeeded {
        account: String,
        attempts: usize,
        recorded: bool,
    },
    /// A non-retryable failure ended the dispatch.
    Abandoned {
        kind: ReactionErrorKind,
        attempts: usize,
    },
    /// Every account failed with a retryable error.
    Exhausted { attempts: usize },
    /// The service was already exhausted; nothing was attempted.
    Inert,
}

#[derive(Clone)]
pub struct ActionDispatcher {
    platform: Arc<dyn TwitterPlatform>,
    store: Arc<dyn EntityStore>,
}

impl ActionDispatcher {
    pub fn new(platform: Arc<dyn TwitterPlatform>, store: Arc<dyn EntityStore>) -> Self {
        Self { platform, store }
    }

    /// Runs the service reaction for `tweet`, failing over across the pool.
    ///
    /// Callers must serialize dispatches per service; the cursor is read and
    /// advanced across awaits.
    pub async fn dispatch(&self, service: &ServiceRuntime, tweet: &StreamTweet) -> DispatchOutcome {
        if service.is_exhausted() {
            return DispatchOutcome::Inert;
        }

        let pool_size = service.pool_size();
        let mut attempts = 0usize;
        loop {
            let (index, account) = service.current_account();
            attempts += 1;
            service.note_dispatch_attempt();
            let client = AccountClient::new(self.platform.clone(), account);

            let failure = match service
                .reaction()
                .react(&client, tweet, self.store.as_ref())
                .await
            {
                Ok(()) => {
                    info!(
                        service = service.name(),
                        tweet_id = %tweet.id_str,
                        author = tweet.author(),
                        account = client.screen_name(),
                        attempts,
                        "reaction executed"
                    );
                    let recorded = self.record_action(service, tweet, client.screen_name()).await;
                    return DispatchOutcome::Succeeded {
                        account: client.screen_name().to_string(),
                        attempts,
                        recorded,
                    };
                }
                Err(failure) => failure,
            };

            if !failure.kind().is_retryable() {
                error!(
                    service = service.name(),
                    tweet_id = %tweet.id_str,
                    account = client.screen_name(),
                    error = %failure,
                    "reaction failed; tweet abandoned"
                );
                return DispatchOutcome::Abandoned {
                    kind: failure.kind(),
                    attempts,
                };
            }

            let next = service.advance_cursor();
            warn!(
                service = service.name(),
                tweet_id = %tweet.id_str,
                account = client.screen_name(),
                attempt = attempts,
                cursor = next,
                failed_cursor = index,
                kind = %failure.kind(),
                error = %failure,
                "account restricted; switching credential"
            );

            if attempts >= pool_size {
                if service.mark_exhausted() {
                    error!(
                        service = service.name(),
                        pool_size,
                        "all accounts restricted; service exhausted"
                    );
                }
                return DispatchOutcome::Exhausted { attempts };
            }
        }
    }

    async fn record_action(&self, service: &ServiceRuntime, tweet: &StreamTweet, account: &str) -> bool {
        let record = ActionRecord::new(
            service.name(),
            tweet.id_str.clone(),
            tweet.author(),
            tweet.text.clone(),
            account,
        );
        match self.store.append_action(record).await {
            Ok(()) => {
                service.note_action_recorded();
                true
            }
            Err(store_error) => {
                error!(
                    service = service.name(),
                    tweet_id = %tweet.id_str,
                    error = %store_error,
                    "failed to record executed action"
                );
                false
            }
        }
    }
}
