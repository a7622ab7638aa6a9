//! Twitter platform client used by tweetgate services.
//!
//! Provides OAuth 1.0a signed REST calls (credential verification, mentions,
//! retweet/favorite reactions), the long-lived `statuses/filter` stream, wire
//! types for stream events, and the `TwitterPlatform` seam the runtime is
//! written against.

#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod platform;
pub mod stream;
pub mod types;

pub use client::TwitterRestClient;
pub use config::TwitterConfig;
pub use credentials::{Credential, VerifiedCredential};
pub use error::{AccountRestriction, TwitterError, TwitterResult};
pub use oauth::OAuthSigner;
pub use platform::{AccountClient, TwitterPlatform};
pub use stream::TweetStream;
pub use types::{MediaEntity, StreamFilter, StreamTweet, TweetAuthor, TweetEntities, TwitterUser};
