//! Stream monitoring runtime.
//!
//! Each configured service verifies its account pool, subscribes to a
//! keyword stream and pushes every event through the filter, blacklist gate
//! and validator before the failover dispatcher runs the service reaction.

pub mod blacklist_gate;
pub mod builtin;
pub mod credential_verification;
pub mod dispatcher;
pub mod runtime;
pub mod service;
pub mod stop_scanner;
pub mod stream_subscriber;
pub mod tweet_filter;

#[cfg(test)]
mod test_support;

pub use blacklist_gate::{BlacklistGate, GateDecision};
pub use builtin::{ReactionSpec, ValidatorSpec};
pub use credential_verification::verify_service_credentials;
pub use dispatcher::{ActionDispatcher, DispatchOutcome};
pub use runtime::{RuntimeOptions, SubscriptionReport, TweetgateRuntime};
pub use service::{
    ReactionError, ReactionErrorKind, ServiceDefinition, ServiceRuntime, ServiceStatus,
    TweetReaction, TweetValidator,
};
pub use stop_scanner::{StopScanReport, StopScanner, STOP_MENTION_PATTERN};
pub use stream_subscriber::{open_subscription, EventOutcome, ServicePipeline, SubscriptionEnd};
pub use tweet_filter::{evaluate_stream_event, FilterDecision, FilterRejection};
