use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tweetgate_runtime::{
    verify_service_credentials, EventOutcome, ReactionSpec, RuntimeOptions, ServiceDefinition,
    ServicePipeline, ServiceRuntime, StopScanner, SubscriptionEnd, TweetgateRuntime,
    ValidatorSpec,
};
use tweetgate_store::{EntityStore, SqliteEntityStore};
use tweetgate_twitter::{
    Credential, StreamFilter, StreamTweet, TweetStream, TwitterConfig, TwitterError,
    TwitterPlatform, TwitterRestClient, TwitterResult, TwitterUser,
};

fn credential(index: usize) -> Credential {
    Credential::new(
        format!("ck-{index}"),
        format!("cs-{index}"),
        format!("at-{index}"),
        format!("ats-{index}"),
    )
}

fn media_tweet(id: &str, author: &str) -> Value {
    json!({
        "id_str": id,
        "text": format!("new build by {author}"),
        "user": {"screen_name": author},
        "entities": {"media": [{"id_str": format!("m-{id}"), "type": "photo"}]}
    })
}

fn media_service(accounts: usize) -> ServiceDefinition {
    ServiceDefinition {
        name: "media".to_string(),
        keywords: "Minecraft".to_string(),
        language: "en".to_string(),
        validator: ValidatorSpec::HasMedia.build(),
        reaction: ReactionSpec::Retweet.build(),
        credentials: (0..accounts).map(credential).collect(),
    }
}

fn long_scan_options() -> RuntimeOptions {
    RuntimeOptions {
        stop_scan_initial_delay: Duration::from_secs(3600),
        stop_scan_interval: Duration::from_secs(3600),
        ..RuntimeOptions::default()
    }
}

fn api_error(status: u16, code: i64, message: &str) -> TwitterError {
    TwitterError::Api {
        status,
        code: Some(code),
        message: message.to_string(),
    }
}

/// Platform double: verification maps `ck-N` to `bot_N`, retweet outcomes
/// are scripted per consumer key.
#[derive(Default)]
struct ScriptedPlatform {
    streams: AsyncMutex<VecDeque<Vec<Value>>>,
    retweet_outcomes: AsyncMutex<HashMap<String, VecDeque<Option<TwitterError>>>>,
    retweets: AsyncMutex<Vec<(String, String)>>,
    mentions: AsyncMutex<HashMap<String, Vec<Value>>>,
}

impl ScriptedPlatform {
    async fn push_stream(&self, events: Vec<Value>) {
        self.streams.lock().await.push_back(events);
    }

    async fn script_retweet(&self, index: usize, outcome: Option<TwitterError>) {
        self.retweet_outcomes
            .lock()
            .await
            .entry(credential(index).consumer_key)
            .or_default()
            .push_back(outcome);
    }

    async fn retweet_log(&self) -> Vec<(String, String)> {
        self.retweets.lock().await.clone()
    }
}

#[async_trait]
impl TwitterPlatform for ScriptedPlatform {
    async fn verify_credentials(&self, credential: &Credential) -> TwitterResult<TwitterUser> {
        let index = credential.consumer_key.trim_start_matches("ck-");
        Ok(TwitterUser {
            id_str: index.to_string(),
            screen_name: format!("bot_{index}"),
        })
    }

    async fn open_filtered_stream(
        &self,
        _credential: &Credential,
        _filter: &StreamFilter,
    ) -> TwitterResult<TweetStream> {
        let events = self
            .streams
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| TwitterError::Stream("no scripted stream".to_string()))?;
        let (sender, receiver) = mpsc::channel(events.len() + 1);
        for event in events {
            sender
                .send(event)
                .await
                .map_err(|error| TwitterError::Stream(error.to_string()))?;
        }
        Ok(TweetStream::from_receiver(receiver))
    }

    async fn mentions_timeline(
        &self,
        credential: &Credential,
        _count: u32,
    ) -> TwitterResult<Vec<StreamTweet>> {
        let mentions = self
            .mentions
            .lock()
            .await
            .get(&credential.consumer_key)
            .cloned()
            .unwrap_or_default();
        Ok(mentions
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect())
    }

    async fn retweet(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()> {
        self.retweets
            .lock()
            .await
            .push((credential.consumer_key.clone(), tweet_id.to_string()));
        let failure = self
            .retweet_outcomes
            .lock()
            .await
            .get_mut(&credential.consumer_key)
            .and_then(VecDeque::pop_front)
            .flatten();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn favorite(&self, _credential: &Credential, _tweet_id: &str) -> TwitterResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn integration_http_pipeline_retweets_only_admitted_media_tweets() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let db_path = tempdir.path().join("actions.db");
    let store = Arc::new(SqliteEntityStore::open(&db_path).expect("store"));
    store.add_to_blacklist("optout").await.expect("seed blacklist");

    let server = MockServer::start();
    let verify = server.mock(|when, then| {
        when.method(GET)
            .path("/1.1/account/verify_credentials.json")
            .header_exists("authorization");
        then.status(200)
            .json_body(json!({"id_str": "7", "screen_name": "gate_bot"}));
    });

    let mut own = media_tweet("100", "gate_bot");
    own["text"] = json!("my own post");
    let mut reshare = media_tweet("101", "sharer");
    reshare["retweeted_status"] = json!({"id_str": "55"});
    let mut plain = media_tweet("103", "plain");
    plain["entities"] = json!({"hashtags": []});
    let body = [
        own,
        reshare,
        media_tweet("102", "optout"),
        plain,
        json!({"limit": {"track": 3}}),
        media_tweet("104", "maker"),
    ]
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join("\r\n")
        + "\r\n";
    let stream = server.mock(|when, then| {
        when.method(POST)
            .path("/1.1/statuses/filter.json")
            .body_includes("track=Minecraft")
            .body_includes("language=en");
        then.status(200).body(body.clone());
    });
    let retweet = server.mock(|when, then| {
        when.method(POST).path("/1.1/statuses/retweet/104.json");
        then.status(200).json_body(json!({"id_str": "9001"}));
    });

    let client = TwitterRestClient::new(TwitterConfig {
        api_base: server.base_url(),
        stream_base: server.base_url(),
        ..TwitterConfig::default()
    })
    .expect("client");

    let mut runtime = TweetgateRuntime::start(
        vec![media_service(1)],
        Arc::new(client),
        store.clone(),
        long_scan_options(),
    )
    .await
    .expect("runtime");

    let reports = runtime.wait_for_subscriptions().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].end, Some(SubscriptionEnd::StreamClosed));
    verify.assert();
    stream.assert();
    retweet.assert();

    let statuses = runtime.statuses();
    let status = &statuses[0];
    assert_eq!(status.events_received, 6);
    assert_eq!(status.events_admitted, 3);
    assert_eq!(status.actions_recorded, 1);
    runtime.shutdown();
    drop(runtime);

    let reopened = SqliteEntityStore::open(&db_path).expect("reopen");
    let actions = reopened.list_actions(Some("media")).await.expect("actions");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].tweet_id, "104");
    assert_eq!(actions[0].screen_name, "maker");
    assert_eq!(actions[0].account, "gate_bot");
}

#[tokio::test]
async fn integration_failover_records_succeeding_account_then_exhausts_pool() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SqliteEntityStore::open(tempdir.path().join("actions.db")).expect("store"));
    let platform = Arc::new(ScriptedPlatform::default());
    platform
        .push_stream(vec![
            media_tweet("1", "alice"),
            media_tweet("2", "bob"),
            media_tweet("3", "carol"),
        ])
        .await;
    platform
        .script_retweet(0, Some(api_error(429, 88, "Rate limit exceeded")))
        .await;
    platform.script_retweet(1, None).await;
    platform
        .script_retweet(1, Some(api_error(403, 64, "Your account is suspended")))
        .await;
    platform
        .script_retweet(2, Some(api_error(403, 326, "To protect our users from spam")))
        .await;
    platform
        .script_retweet(0, Some(api_error(429, 88, "Rate limit exceeded")))
        .await;

    let mut runtime = TweetgateRuntime::start(
        vec![media_service(3)],
        platform.clone(),
        store.clone(),
        long_scan_options(),
    )
    .await
    .expect("runtime");

    let reports = runtime.wait_for_subscriptions().await;
    assert_eq!(reports[0].end, Some(SubscriptionEnd::Exhausted));

    let statuses = runtime.statuses();
    let status = &statuses[0];
    assert!(status.exhausted);
    assert_eq!(status.pool_size, 3);
    assert_eq!(status.cursor, 1);
    assert_eq!(status.dispatch_attempts, 5);

    let attempts: Vec<(String, String)> = platform.retweet_log().await;
    let expected: Vec<(String, String)> = [
        ("ck-0", "1"),
        ("ck-1", "1"),
        ("ck-1", "2"),
        ("ck-2", "2"),
        ("ck-0", "2"),
    ]
    .iter()
    .map(|(key, id)| (key.to_string(), id.to_string()))
    .collect();
    assert_eq!(attempts, expected);

    let actions = store.list_actions(None).await.expect("actions");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].tweet_id, "1");
    assert_eq!(actions[0].account, "bot_1");
    runtime.shutdown();
}

#[tokio::test]
async fn integration_stop_mention_blocks_later_tweets_from_requester() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn EntityStore> =
        Arc::new(SqliteEntityStore::open(tempdir.path().join("actions.db")).expect("store"));
    let platform = Arc::new(ScriptedPlatform::default());
    platform.mentions.lock().await.insert(
        credential(0).consumer_key,
        vec![json!({
            "id_str": "900",
            "text": "@bot_0 STOP",
            "user": {"screen_name": "quitter"}
        })],
    );

    let definition = media_service(1);
    let accounts =
        verify_service_credentials(platform.as_ref(), &definition.name, &definition.credentials)
            .await;
    let service = Arc::new(ServiceRuntime::new(&definition, accounts).expect("service"));

    let scanner = StopScanner::new(platform.clone(), store.clone(), vec![service.clone()], 5)
        .expect("scanner");
    let report = scanner.scan_once().await;
    assert_eq!(report.added, vec!["quitter".to_string()]);

    let pipeline = ServicePipeline::new(service, platform.clone(), store.clone());
    assert_eq!(
        pipeline.process_event(&media_tweet("901", "quitter")).await,
        EventOutcome::Blacklisted
    );
    assert!(platform.retweet_log().await.is_empty());
    assert!(store.list_actions(None).await.expect("actions").is_empty());
}
