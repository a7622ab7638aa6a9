use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tweetgate_store::{ActionRecord, EntityStore, InMemoryEntityStore, StoreError, StoreResult};
use tweetgate_twitter::{
    AccountClient, Credential, StreamFilter, StreamTweet, TweetStream, TwitterError,
    TwitterPlatform, TwitterResult, TwitterUser, VerifiedCredential,
};

use crate::service::{ReactionError, ServiceDefinition, TweetReaction, TweetValidator};

pub(crate) fn credential(index: usize) -> Credential {
    Credential::new(
        format!("consumer-{index}"),
        format!("consumer-secret-{index}"),
        format!("token-{index}"),
        format!("token-secret-{index}"),
    )
}

pub(crate) fn verified_accounts(count: usize) -> Vec<VerifiedCredential> {
    (0..count)
        .map(|index| VerifiedCredential::new(credential(index), format!("bot_{index}")))
        .collect()
}

pub(crate) fn service_definition(
    name: &str,
    reaction: Arc<ScriptedReaction>,
    credentials: usize,
) -> ServiceDefinition {
    service_definition_with_validator(name, reaction, StaticValidator::new(true), credentials)
}

pub(crate) fn service_definition_with_validator(
    name: &str,
    reaction: Arc<ScriptedReaction>,
    validator: Arc<StaticValidator>,
    credentials: usize,
) -> ServiceDefinition {
    ServiceDefinition {
        name: name.to_string(),
        keywords: "Minecraft".to_string(),
        language: "en".to_string(),
        validator,
        reaction,
        credentials: (0..credentials).map(credential).collect(),
    }
}

pub(crate) fn tweet_event(id: &str, author: &str, text: &str) -> Value {
    json!({
        "id_str": id,
        "text": text,
        "user": {"screen_name": author, "id_str": format!("u-{author}")},
        "entities": {"media": [{"id_str": "m1", "type": "photo"}]},
        "lang": "en"
    })
}

pub(crate) fn tweet(id: &str, author: &str, text: &str) -> StreamTweet {
    serde_json::from_value(tweet_event(id, author, text)).expect("tweet fixture")
}

/// Reaction that replays scripted outcomes and records the executing account.
#[derive(Default)]
pub(crate) struct ScriptedReaction {
    responses: Mutex<VecDeque<Result<(), ReactionError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedReaction {
    pub(crate) fn always_ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn scripted(responses: Vec<Result<(), ReactionError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// `(account screen name, tweet id)` per invocation.
    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl TweetReaction for ScriptedReaction {
    async fn react(
        &self,
        account: &AccountClient,
        tweet: &StreamTweet,
        _store: &dyn EntityStore,
    ) -> Result<(), ReactionError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((account.screen_name().to_string(), tweet.id_str.clone()));
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

pub(crate) struct StaticValidator {
    verdict: bool,
    calls: AtomicUsize,
}

impl StaticValidator {
    pub(crate) fn new(verdict: bool) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TweetValidator for StaticValidator {
    async fn validate(&self, _tweet: &StreamTweet) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

/// In-memory store that counts lookups and can be told to fail.
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: InMemoryEntityStore,
    lookups: AtomicUsize,
    fail_lookups: bool,
    fail_appends: bool,
}

impl CountingStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing_lookups() -> Arc<Self> {
        Arc::new(Self {
            fail_lookups: true,
            ..Self::default()
        })
    }

    pub(crate) fn failing_appends() -> Arc<Self> {
        Arc::new(Self {
            fail_appends: true,
            ..Self::default()
        })
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

fn unavailable(field: &'static str) -> StoreError {
    StoreError::InvalidPersistedValue {
        field,
        value: "store unavailable".to_string(),
    }
}

#[async_trait]
impl EntityStore for CountingStore {
    async fn is_blacklisted(&self, screen_name: &str) -> StoreResult<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(unavailable("blacklist"));
        }
        self.inner.is_blacklisted(screen_name).await
    }

    async fn add_to_blacklist(&self, screen_name: &str) -> StoreResult<bool> {
        self.inner.add_to_blacklist(screen_name).await
    }

    async fn list_blacklist(&self) -> StoreResult<Vec<String>> {
        self.inner.list_blacklist().await
    }

    async fn append_action(&self, record: ActionRecord) -> StoreResult<()> {
        if self.fail_appends {
            return Err(unavailable("actions"));
        }
        self.inner.append_action(record).await
    }

    async fn list_actions(&self, service: Option<&str>) -> StoreResult<Vec<ActionRecord>> {
        self.inner.list_actions(service).await
    }
}

/// Platform double keyed by consumer key.
#[derive(Default)]
pub(crate) struct ScriptedPlatform {
    users: Mutex<HashMap<String, Result<String, String>>>,
    verify_calls: Mutex<Vec<String>>,
    streams: Mutex<VecDeque<Vec<Value>>>,
    hold_streams_open: bool,
    open_senders: Mutex<Vec<mpsc::Sender<Value>>>,
    stream_openers: Mutex<Vec<(String, StreamFilter)>>,
    mentions: Mutex<HashMap<String, Result<Vec<Value>, String>>>,
    mention_counts: Mutex<Vec<u32>>,
    retweet_responses: Mutex<VecDeque<TwitterResult<()>>>,
    retweets: Mutex<Vec<(String, String)>>,
    favorites: Mutex<Vec<(String, String)>>,
}

impl ScriptedPlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn holding_streams_open() -> Self {
        Self {
            hold_streams_open: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_user(self, index: usize, screen_name: &str) -> Self {
        self.users
            .lock()
            .expect("users lock")
            .insert(credential(index).consumer_key, Ok(screen_name.to_string()));
        self
    }

    pub(crate) fn with_rejected_user(self, index: usize) -> Self {
        self.users.lock().expect("users lock").insert(
            credential(index).consumer_key,
            Err("Invalid or expired token.".to_string()),
        );
        self
    }

    pub(crate) fn with_stream(self, events: Vec<Value>) -> Self {
        self.streams.lock().expect("streams lock").push_back(events);
        self
    }

    pub(crate) fn with_mentions(self, index: usize, mentions: Vec<Value>) -> Self {
        self.mentions
            .lock()
            .expect("mentions lock")
            .insert(credential(index).consumer_key, Ok(mentions));
        self
    }

    pub(crate) fn with_failing_mentions(self, index: usize) -> Self {
        self.mentions.lock().expect("mentions lock").insert(
            credential(index).consumer_key,
            Err("Rate limit exceeded".to_string()),
        );
        self
    }

    pub(crate) fn with_retweet_responses(self, responses: Vec<TwitterResult<()>>) -> Self {
        *self.retweet_responses.lock().expect("retweet lock") = responses.into();
        self
    }

    pub(crate) fn verify_calls(&self) -> Vec<String> {
        self.verify_calls.lock().expect("verify lock").clone()
    }

    pub(crate) fn stream_openers(&self) -> Vec<(String, StreamFilter)> {
        self.stream_openers.lock().expect("openers lock").clone()
    }

    pub(crate) fn mention_counts(&self) -> Vec<u32> {
        self.mention_counts.lock().expect("mention counts lock").clone()
    }

    pub(crate) fn retweets(&self) -> Vec<(String, String)> {
        self.retweets.lock().expect("retweets lock").clone()
    }

    pub(crate) fn favorites(&self) -> Vec<(String, String)> {
        self.favorites.lock().expect("favorites lock").clone()
    }

    pub(crate) fn held_stream_closed(&self) -> bool {
        self.open_senders
            .lock()
            .expect("senders lock")
            .last()
            .is_some_and(|sender| sender.is_closed())
    }
}

#[async_trait]
impl TwitterPlatform for ScriptedPlatform {
    async fn verify_credentials(&self, credential: &Credential) -> TwitterResult<TwitterUser> {
        self.verify_calls
            .lock()
            .expect("verify lock")
            .push(credential.consumer_key.clone());
        let outcome = self
            .users
            .lock()
            .expect("users lock")
            .get(&credential.consumer_key)
            .cloned();
        match outcome {
            Some(Ok(screen_name)) => Ok(TwitterUser {
                id_str: format!("id-{screen_name}"),
                screen_name,
            }),
            Some(Err(message)) => Err(TwitterError::Api {
                status: 401,
                code: Some(89),
                message,
            }),
            None => Err(TwitterError::Api {
                status: 401,
                code: Some(32),
                message: "Could not authenticate you.".to_string(),
            }),
        }
    }

    async fn open_filtered_stream(
        &self,
        credential: &Credential,
        filter: &StreamFilter,
    ) -> TwitterResult<TweetStream> {
        self.stream_openers
            .lock()
            .expect("openers lock")
            .push((credential.consumer_key.clone(), filter.clone()));
        let Some(events) = self.streams.lock().expect("streams lock").pop_front() else {
            return Err(TwitterError::Stream("stream rejected".to_string()));
        };
        let (sender, receiver) = mpsc::channel(events.len() + 8);
        for event in events {
            sender.try_send(event).expect("scripted event");
        }
        if self.hold_streams_open {
            self.open_senders.lock().expect("senders lock").push(sender);
        }
        Ok(TweetStream::from_receiver(receiver))
    }

    async fn mentions_timeline(
        &self,
        credential: &Credential,
        count: u32,
    ) -> TwitterResult<Vec<StreamTweet>> {
        self.mention_counts
            .lock()
            .expect("mention counts lock")
            .push(count);
        let scripted = self
            .mentions
            .lock()
            .expect("mentions lock")
            .get(&credential.consumer_key)
            .cloned()
            .unwrap_or(Ok(Vec::new()));
        match scripted {
            Ok(values) => Ok(values
                .into_iter()
                .filter_map(|value| serde_json::from_value(value).ok())
                .collect()),
            Err(message) => Err(TwitterError::Api {
                status: 429,
                code: Some(88),
                message,
            }),
        }
    }

    async fn retweet(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()> {
        self.retweets
            .lock()
            .expect("retweets lock")
            .push((credential.consumer_key.clone(), tweet_id.to_string()));
        self.retweet_responses
            .lock()
            .expect("retweet lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn favorite(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()> {
        self.favorites
            .lock()
            .expect("favorites lock")
            .push((credential.consumer_key.clone(), tweet_id.to_string()));
        Ok(())
    }
}
