//! Process-level orchestration: verify credentials, open one subscription per
//! service, and run the periodic STOP scan.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tweetgate_store::EntityStore;
use tweetgate_twitter::TwitterPlatform;

use crate::credential_verification::verify_service_credentials;
use crate::service::{ServiceDefinition, ServiceRuntime, ServiceStatus};
use crate::stop_scanner::{StopScanner, DEFAULT_MENTIONS_PER_ACCOUNT};
use crate::stream_subscriber::{open_subscription, ServicePipeline, SubscriptionEnd};

pub const DEFAULT_STOP_SCAN_INITIAL_DELAY: Duration = Duration::from_secs(120);
pub const DEFAULT_STOP_SCAN_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub stop_scan_initial_delay: Duration,
    pub stop_scan_interval: Duration,
    pub mentions_per_account: u32,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            stop_scan_initial_delay: DEFAULT_STOP_SCAN_INITIAL_DELAY,
            stop_scan_interval: DEFAULT_STOP_SCAN_INTERVAL,
            mentions_per_account: DEFAULT_MENTIONS_PER_ACCOUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionReport {
    pub service: String,
    /// `None` when the subscription task was cancelled or panicked.
    pub end: Option<SubscriptionEnd>,
}

/// Handle to the running services.
pub struct TweetgateRuntime {
    services: Vec<Arc<ServiceRuntime>>,
    subscriptions: Vec<(String, JoinHandle<SubscriptionEnd>)>,
    stop_scanner: Option<JoinHandle<()>>,
}

impl TweetgateRuntime {
    /// Verifies every service's credentials in order, opens subscriptions for
    /// the services that have at least one verified account, and schedules
    /// the STOP scan. Fails only when no service could be started.
    pub async fn start(
        definitions: Vec<ServiceDefinition>,
        platform: Arc<dyn TwitterPlatform>,
        store: Arc<dyn EntityStore>,
        options: RuntimeOptions,
    ) -> Result<Self> {
        let mut verified_services = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            let accounts =
                verify_service_credentials(platform.as_ref(), &definition.name, &definition.credentials)
                    .await;
            if accounts.is_empty() {
                warn!(service = %definition.name, "no verified credentials; service not started");
                continue;
            }
            verified_services.push(Arc::new(ServiceRuntime::new(definition, accounts)?));
        }

        let mut services = Vec::with_capacity(verified_services.len());
        let mut subscriptions = Vec::with_capacity(verified_services.len());
        for service in verified_services {
            let stream = match open_subscription(platform.as_ref(), &service).await {
                Ok(stream) => stream,
                Err(error) => {
                    error!(service = service.name(), error = %error, "failed to open subscription");
                    continue;
                }
            };
            let pipeline = ServicePipeline::new(service.clone(), platform.clone(), store.clone());
            let handle = tokio::spawn(async move { pipeline.run(stream).await });
            info!(
                service = service.name(),
                pool_size = service.pool_size(),
                "service started"
            );
            subscriptions.push((service.name().to_string(), handle));
            services.push(service);
        }

        if services.is_empty() {
            bail!("no service could be started");
        }

        let scanner = StopScanner::new(
            platform,
            store,
            services.clone(),
            options.mentions_per_account,
        )?;
        let stop_scanner = tokio::spawn(
            scanner.run(options.stop_scan_initial_delay, options.stop_scan_interval),
        );

        Ok(Self {
            services,
            subscriptions,
            stop_scanner: Some(stop_scanner),
        })
    }

    pub fn services(&self) -> &[Arc<ServiceRuntime>] {
        &self.services
    }

    pub fn statuses(&self) -> Vec<ServiceStatus> {
        self.services.iter().map(|service| service.status()).collect()
    }

    /// Waits until every subscription has ended.
    ///
    /// Cancel safe: a handle leaves `subscriptions` only after its task has
    /// finished, so a later `shutdown` still aborts the ones left running.
    pub async fn wait_for_subscriptions(&mut self) -> Vec<SubscriptionReport> {
        let mut reports = Vec::with_capacity(self.subscriptions.len());
        while let Some((_, handle)) = self.subscriptions.first_mut() {
            let joined = handle.await;
            let (service, _) = self.subscriptions.remove(0);
            let end = match joined {
                Ok(end) => Some(end),
                Err(join_error) => {
                    error!(service = %service, error = %join_error, "subscription task failed");
                    None
                }
            };
            reports.push(SubscriptionReport { service, end });
        }
        reports
    }

    /// Aborts the STOP scan and any subscriptions still running.
    pub fn shutdown(&mut self) {
        for (_, handle) in self.subscriptions.drain(..) {
            handle.abort();
        }
        if let Some(scanner) = self.stop_scanner.take() {
            scanner.abort();
        }
    }
}

impl Drop for TweetgateRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
