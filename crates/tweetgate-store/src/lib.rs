//! Entity store abstractions and in-memory backend.
//!
//! The store owns two append-only collections shared by every service: the
//! opt-out blacklist (unique screen names) and the action log.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

mod sqlite;

pub use sqlite::SqliteEntityStore;

/// Result type for entity store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid persisted value for '{field}': {value}")]
    InvalidPersistedValue { field: &'static str, value: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Durable log entry for one successfully executed reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub service: String,
    pub tweet_id: String,
    /// Author of the tweet the reaction was applied to.
    pub screen_name: String,
    pub text: String,
    /// Screen name of the account that executed the reaction.
    pub account: String,
    pub created_at: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(
        service: impl Into<String>,
        tweet_id: impl Into<String>,
        screen_name: impl Into<String>,
        text: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            tweet_id: tweet_id.into(),
            screen_name: screen_name.into(),
            text: text.into(),
            account: account.into(),
            created_at: Utc::now(),
        }
    }
}

/// Async store contract consumed by the runtime and admin commands.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Exact, case-sensitive lookup of `screen_name` in the blacklist.
    async fn is_blacklisted(&self, screen_name: &str) -> StoreResult<bool>;
    /// Adds `screen_name`; returns false when it was already present.
    async fn add_to_blacklist(&self, screen_name: &str) -> StoreResult<bool>;
    async fn list_blacklist(&self) -> StoreResult<Vec<String>>;

    async fn append_action(&self, record: ActionRecord) -> StoreResult<()>;
    async fn list_actions(&self, service: Option<&str>) -> StoreResult<Vec<ActionRecord>>;
}

/// In-memory implementation for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    blacklist: Vec<String>,
    blacklist_index: HashSet<String>,
    actions: Vec<ActionRecord>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn is_blacklisted(&self, screen_name: &str) -> StoreResult<bool> {
        Ok(self.inner.read().await.blacklist_index.contains(screen_name))
    }

    async fn add_to_blacklist(&self, screen_name: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.blacklist_index.insert(screen_name.to_string()) {
            return Ok(false);
        }
        inner.blacklist.push(screen_name.to_string());
        Ok(true)
    }

    async fn list_blacklist(&self) -> StoreResult<Vec<String>> {
        Ok(self.inner.read().await.blacklist.clone())
    }

    async fn append_action(&self, record: ActionRecord) -> StoreResult<()> {
        self.inner.write().await.actions.push(record);
        Ok(())
    }

    async fn list_actions(&self, service: Option<&str>) -> StoreResult<Vec<ActionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .actions
            .iter()
            .filter(|record| service.map_or(true, |service| record.service == service))
            .cloned()
            .collect())
    }
}
