use std::sync::Arc;

use tweetgate_store::{EntityStore, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Blacklisted,
}

/// Opt-out check against the shared blacklist. Matching is exact and
/// case-sensitive; one lookup per admitted tweet.
#[derive(Clone)]
pub struct BlacklistGate {
    store: Arc<dyn EntityStore>,
}

impl BlacklistGate {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, screen_name: &str) -> StoreResult<GateDecision> {
        if self.store.is_blacklisted(screen_name).await? {
            return Ok(GateDecision::Blacklisted);
        }
        Ok(GateDecision::Pass)
    }
}
