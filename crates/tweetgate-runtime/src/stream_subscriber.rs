//! Per-service event pipeline: filter, blacklist gate, validator, dispatch.
//!
//! Events are processed one at a time in arrival order, so dispatches for a
//! service never overlap.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use tweetgate_store::EntityStore;
use tweetgate_twitter::{TweetStream, TwitterPlatform, TwitterResult};

use crate::blacklist_gate::{BlacklistGate, GateDecision};
use crate::dispatcher::{ActionDispatcher, DispatchOutcome};
use crate::service::ServiceRuntime;
use crate::tweet_filter::{evaluate_stream_event, FilterDecision, FilterRejection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Filtered(FilterRejection),
    Blacklisted,
    GateUnavailable,
    Invalid,
    Dispatched(DispatchOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEnd {
    /// The service became exhausted and closed its stream.
    Exhausted,
    /// The platform ended the connection.
    StreamClosed,
}

/// Opens the service subscription with its first verified account.
pub async fn open_subscription(
    platform: &dyn TwitterPlatform,
    service: &ServiceRuntime,
) -> TwitterResult<TweetStream> {
    let account = service.subscription_account();
    info!(
        service = service.name(),
        account = %account.screen_name,
        track = %service.stream_filter().track,
        "opening subscription"
    );
    platform
        .open_filtered_stream(&account.credential, service.stream_filter())
        .await
}

#[derive(Clone)]
pub struct ServicePipeline {
    service: Arc<ServiceRuntime>,
    gate: BlacklistGate,
    dispatcher: ActionDispatcher,
}

impl ServicePipeline {
    pub fn new(
        service: Arc<ServiceRuntime>,
        platform: Arc<dyn TwitterPlatform>,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        Self {
            service,
            gate: BlacklistGate::new(store.clone()),
            dispatcher: ActionDispatcher::new(platform, store),
        }
    }

    pub fn service(&self) -> &Arc<ServiceRuntime> {
        &self.service
    }

    /// Runs one raw event through every stage.
    pub async fn process_event(&self, event: &Value) -> EventOutcome {
        let service = self.service.as_ref();
        service.note_event_received();

        let tweet = match evaluate_stream_event(event, service.own_screen_names()) {
            FilterDecision::Admit(tweet) => tweet,
            FilterDecision::Reject(reason) => {
                debug!(service = service.name(), reason = reason.as_str(), "event filtered");
                return EventOutcome::Filtered(reason);
            }
        };
        service.note_event_admitted();

        match self.gate.check(tweet.author()).await {
            Ok(GateDecision::Pass) => {}
            Ok(GateDecision::Blacklisted) => {
                debug!(
                    service = service.name(),
                    author = tweet.author(),
                    "author opted out"
                );
                return EventOutcome::Blacklisted;
            }
            Err(store_error) => {
                warn!(
                    service = service.name(),
                    tweet_id = %tweet.id_str,
                    error = %store_error,
                    "blacklist lookup failed; dropping event"
                );
                return EventOutcome::GateUnavailable;
            }
        }

        if !service.validator().validate(&tweet).await {
            debug!(service = service.name(), tweet_id = %tweet.id_str, "tweet not valid");
            return EventOutcome::Invalid;
        }

        EventOutcome::Dispatched(self.dispatcher.dispatch(service, &tweet).await)
    }

    /// Consumes `stream` until it closes or the service is exhausted.
    pub async fn run(&self, mut stream: TweetStream) -> SubscriptionEnd {
        let mut exhausted = self.service.subscribe_exhausted();
        loop {
            if *exhausted.borrow() {
                stream.stop();
                info!(service = self.service.name(), "subscription stopped; service exhausted");
                return SubscriptionEnd::Exhausted;
            }

            let event = tokio::select! {
                event = stream.next_event() => event,
                changed = exhausted.changed() => {
                    if changed.is_err() {
                        return SubscriptionEnd::Exhausted;
                    }
                    continue;
                }
            };

            let Some(event) = event else {
                warn!(service = self.service.name(), "subscription closed by platform");
                return SubscriptionEnd::StreamClosed;
            };
            self.process_event(&event).await;
        }
    }
}
