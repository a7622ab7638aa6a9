//! Service model: host-supplied capabilities, the verified credential pool,
//! and the per-service dispatch cursor.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tweetgate_store::EntityStore;
use tweetgate_twitter::{
    AccountClient, AccountRestriction, Credential, StreamFilter, StreamTweet, TwitterError,
    VerifiedCredential,
};

#[async_trait]
/// Decides whether an admitted, non-blacklisted tweet deserves a reaction.
pub trait TweetValidator: Send + Sync {
    async fn validate(&self, tweet: &StreamTweet) -> bool;
}

#[async_trait]
/// Executes the service's reaction with the account the dispatcher selected.
pub trait TweetReaction: Send + Sync {
    async fn react(
        &self,
        account: &AccountClient,
        tweet: &StreamTweet,
        store: &dyn EntityStore,
    ) -> Result<(), ReactionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Classification of a failed reaction.
pub enum ReactionErrorKind {
    RateLimited,
    Suspended,
    Other,
}

impl ReactionErrorKind {
    /// Rate limits and suspensions are tied to the account, so another
    /// account may still succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Suspended)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Suspended => "suspended",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ReactionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AccountRestriction> for ReactionErrorKind {
    fn from(value: AccountRestriction) -> Self {
        match value {
            AccountRestriction::RateLimited => Self::RateLimited,
            AccountRestriction::Suspended => Self::Suspended,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
/// Error returned by a `TweetReaction`.
pub struct ReactionError {
    kind: ReactionErrorKind,
    message: String,
}

impl ReactionError {
    pub fn new(kind: ReactionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ReactionErrorKind::RateLimited, message)
    }

    pub fn suspended(message: impl Into<String>) -> Self {
        Self::new(ReactionErrorKind::Suspended, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ReactionErrorKind::Other, message)
    }

    /// Classifies a free-form message with the legacy case-sensitive
    /// `suspended` / `Twittering` markers.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = AccountRestriction::from_message(&message)
            .map(ReactionErrorKind::from)
            .unwrap_or(ReactionErrorKind::Other);
        Self { kind, message }
    }

    pub fn kind(&self) -> ReactionErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<TwitterError> for ReactionError {
    fn from(error: TwitterError) -> Self {
        let kind = error
            .account_restriction()
            .map(ReactionErrorKind::from)
            .unwrap_or(ReactionErrorKind::Other);
        Self::new(kind, error.to_string())
    }
}

#[derive(Clone)]
/// Host-supplied definition of one monitoring + reaction unit.
pub struct ServiceDefinition {
    pub name: String,
    pub keywords: String,
    pub language: String,
    pub validator: Arc<dyn TweetValidator>,
    pub reaction: Arc<dyn TweetReaction>,
    pub credentials: Vec<Credential>,
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("name", &self.name)
            .field("keywords", &self.keywords)
            .field("language", &self.language)
            .field("credentials", &self.credentials.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Point-in-time view of a running service.
pub struct ServiceStatus {
    pub name: String,
    pub pool_size: usize,
    pub cursor: usize,
    pub exhausted: bool,
    pub events_received: u64,
    pub events_admitted: u64,
    pub dispatch_attempts: u64,
    pub actions_recorded: u64,
}

#[derive(Debug, Default)]
struct ServiceCounters {
    events_received: AtomicU64,
    events_admitted: AtomicU64,
    dispatch_attempts: AtomicU64,
    actions_recorded: AtomicU64,
}

/// A started service: verified accounts, the dispatch cursor and the
/// permanent exhaustion latch.
pub struct ServiceRuntime {
    name: String,
    filter: StreamFilter,
    validator: Arc<dyn TweetValidator>,
    reaction: Arc<dyn TweetReaction>,
    accounts: Vec<VerifiedCredential>,
    own_screen_names: HashSet<String>,
    cursor: Mutex<usize>,
    exhausted_tx: watch::Sender<bool>,
    counters: ServiceCounters,
}

impl ServiceRuntime {
    /// Builds the runtime state for `definition` from its verified accounts.
    /// A service without verified accounts is never started.
    pub fn new(definition: &ServiceDefinition, accounts: Vec<VerifiedCredential>) -> Result<Self> {
        if accounts.is_empty() {
            bail!(
                "service '{}' has no verified credentials",
                definition.name
            );
        }
        let own_screen_names = accounts
            .iter()
            .map(|account| account.screen_name.clone())
            .collect();
        let (exhausted_tx, _) = watch::channel(false);
        Ok(Self {
            name: definition.name.clone(),
            filter: StreamFilter::new(definition.keywords.clone(), definition.language.clone()),
            validator: definition.validator.clone(),
            reaction: definition.reaction.clone(),
            accounts,
            own_screen_names,
            cursor: Mutex::new(0),
            exhausted_tx,
            counters: ServiceCounters::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream_filter(&self) -> &StreamFilter {
        &self.filter
    }

    pub fn validator(&self) -> &dyn TweetValidator {
        self.validator.as_ref()
    }

    pub fn reaction(&self) -> &dyn TweetReaction {
        self.reaction.as_ref()
    }

    pub fn accounts(&self) -> &[VerifiedCredential] {
        &self.accounts
    }

    pub fn pool_size(&self) -> usize {
        self.accounts.len()
    }

    /// Account used to authenticate the subscription, independent of the cursor.
    pub fn subscription_account(&self) -> &VerifiedCredential {
        &self.accounts[0]
    }

    pub fn own_screen_names(&self) -> &HashSet<String> {
        &self.own_screen_names
    }

    pub fn cursor(&self) -> usize {
        *lock_or_recover_mutex(&self.cursor)
    }

    /// Returns the cursor position and the account it points at.
    pub fn current_account(&self) -> (usize, VerifiedCredential) {
        let cursor = *lock_or_recover_mutex(&self.cursor);
        (cursor, self.accounts[cursor].clone())
    }

    /// Moves the cursor to `(cursor + 1) mod pool_size` and returns it.
    pub fn advance_cursor(&self) -> usize {
        let mut cursor = lock_or_recover_mutex(&self.cursor);
        *cursor = (*cursor + 1) % self.accounts.len();
        *cursor
    }

    pub fn is_exhausted(&self) -> bool {
        *self.exhausted_tx.borrow()
    }

    /// Latches the service into the exhausted state. Returns true on the
    /// first transition.
    pub fn mark_exhausted(&self) -> bool {
        self.exhausted_tx.send_if_modified(|exhausted| {
            if *exhausted {
                return false;
            }
            *exhausted = true;
            true
        })
    }

    pub fn subscribe_exhausted(&self) -> watch::Receiver<bool> {
        self.exhausted_tx.subscribe()
    }

    pub(crate) fn note_event_received(&self) {
        self.counters.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_event_admitted(&self) {
        self.counters.events_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_dispatch_attempt(&self) {
        self.counters
            .dispatch_attempts
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_action_recorded(&self) {
        self.counters.actions_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            name: self.name.clone(),
            pool_size: self.pool_size(),
            cursor: self.cursor(),
            exhausted: self.is_exhausted(),
            events_received: self.counters.events_received.load(Ordering::Relaxed),
            events_admitted: self.counters.events_admitted.load(Ordering::Relaxed),
            dispatch_attempts: self.counters.dispatch_attempts.load(Ordering::Relaxed),
            actions_recorded: self.counters.actions_recorded.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for ServiceRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRuntime")
            .field("name", &self.name)
            .field("pool_size", &self.accounts.len())
            .field("cursor", &self.cursor())
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

fn lock_or_recover_mutex<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
