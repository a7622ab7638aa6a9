//! First-stage event filter: drops malformed events, the service's own
//! tweets and retweets before any store or validator work happens.

use std::collections::HashSet;

use serde_json::Value;
use tweetgate_twitter::StreamTweet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRejection {
    Malformed,
    SelfAuthored,
    Retweet,
}

impl FilterRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::SelfAuthored => "self_authored",
            Self::Retweet => "retweet",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    Admit(StreamTweet),
    Reject(FilterRejection),
}

/// Evaluates one raw stream event against the service's own screen names.
pub fn evaluate_stream_event(event: &Value, own_screen_names: &HashSet<String>) -> FilterDecision {
    let Ok(tweet) = serde_json::from_value::<StreamTweet>(event.clone()) else {
        return FilterDecision::Reject(FilterRejection::Malformed);
    };
    if own_screen_names.contains(tweet.author()) {
        return FilterDecision::Reject(FilterRejection::SelfAuthored);
    }
    if tweet.is_retweet() {
        return FilterDecision::Reject(FilterRejection::Retweet);
    }
    FilterDecision::Admit(tweet)
}
