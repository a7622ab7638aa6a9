//! Periodic opt-out scan over each account's recent mentions.
//!
//! A mention whose whole text is `@<handle> STOP` (one optional trailing
//! space) adds its author to the shared blacklist.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};
use tweetgate_store::EntityStore;
use tweetgate_twitter::{TwitterPlatform, VerifiedCredential};

use crate::service::ServiceRuntime;

pub const STOP_MENTION_PATTERN: &str = r"^@(\S+) STOP ?$";
pub const DEFAULT_MENTIONS_PER_ACCOUNT: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopScanReport {
    pub accounts_scanned: usize,
    pub account_errors: usize,
    pub added: Vec<String>,
}

pub struct StopScanner {
    platform: Arc<dyn TwitterPlatform>,
    store: Arc<dyn EntityStore>,
    services: Vec<Arc<ServiceRuntime>>,
    matcher: Regex,
    mentions_per_account: u32,
}

impl StopScanner {
    pub fn new(
        platform: Arc<dyn TwitterPlatform>,
        store: Arc<dyn EntityStore>,
        services: Vec<Arc<ServiceRuntime>>,
        mentions_per_account: u32,
    ) -> Result<Self> {
        let matcher = Regex::new(STOP_MENTION_PATTERN).context("invalid stop mention pattern")?;
        Ok(Self {
            platform,
            store,
            services,
            matcher,
            mentions_per_account,
        })
    }

    pub fn is_stop_request(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// Scans every verified account of every started service once.
    pub async fn scan_once(&self) -> StopScanReport {
        let mut report = StopScanReport::default();
        for service in &self.services {
            for account in service.accounts() {
                report.accounts_scanned += 1;
                if let Err(error) = self.scan_account(service.name(), account, &mut report).await {
                    report.account_errors += 1;
                    warn!(
                        service = service.name(),
                        account = %account.screen_name,
                        error = %error,
                        "stop scan failed for account"
                    );
                }
            }
        }
        report
    }

    async fn scan_account(
        &self,
        service: &str,
        account: &VerifiedCredential,
        report: &mut StopScanReport,
    ) -> Result<()> {
        let mentions = self
            .platform
            .mentions_timeline(&account.credential, self.mentions_per_account)
            .await
            .context("failed to fetch mentions")?;

        for mention in mentions {
            if !self.is_stop_request(&mention.text) {
                continue;
            }
            let author = mention.author();
            if self
                .store
                .is_blacklisted(author)
                .await
                .context("failed to check blacklist")?
            {
                debug!(service, author, "stop request already honoured");
                continue;
            }
            if self
                .store
                .add_to_blacklist(author)
                .await
                .context("failed to add stop requester to blacklist")?
            {
                info!(service, account = %account.screen_name, author, "author opted out via STOP");
                report.added.push(author.to_string());
            }
        }
        Ok(())
    }

    /// Waits `initial_delay`, then scans every `interval` until the task is
    /// aborted.
    pub async fn run(self, initial_delay: Duration, interval: Duration) {
        tokio::time::sleep(initial_delay).await;
        loop {
            let report = self.scan_once().await;
            debug!(
                accounts_scanned = report.accounts_scanned,
                account_errors = report.account_errors,
                added = report.added.len(),
                "stop scan complete"
            );
            tokio::time::sleep(interval).await;
        }
    }
}
