use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tweetgate_runtime::{RuntimeOptions, TweetgateRuntime};
use tweetgate_store::EntityStore;
use tweetgate_twitter::{TwitterConfig, TwitterPlatform, TwitterRestClient};

use crate::cli_args::RunArgs;
use crate::service_config::load_service_config;

pub(crate) fn twitter_config_from_args(args: &RunArgs) -> TwitterConfig {
    TwitterConfig {
        api_base: args.api_base.clone(),
        stream_base: args.stream_base.clone(),
        request_timeout_ms: args.request_timeout_ms,
        ..TwitterConfig::default()
    }
}

pub(crate) fn runtime_options_from_args(args: &RunArgs) -> RuntimeOptions {
    RuntimeOptions {
        stop_scan_initial_delay: Duration::from_millis(args.stop_scan_initial_delay_ms),
        stop_scan_interval: Duration::from_millis(args.stop_scan_interval_ms),
        ..RuntimeOptions::default()
    }
}

/// Starts every enabled service and blocks until Ctrl-C or until every
/// subscription has ended.
pub(crate) async fn execute_run_command(args: &RunArgs, store: Arc<dyn EntityStore>) -> Result<()> {
    let config = load_service_config(&args.config)?;
    let definitions = config.enabled_definitions();
    let skipped = config.services.len() - definitions.len();
    if skipped > 0 {
        info!(skipped, "disabled services skipped");
    }

    let client = TwitterRestClient::new(twitter_config_from_args(args))
        .context("failed to build twitter client")?;
    let platform: Arc<dyn TwitterPlatform> = Arc::new(client);

    let mut runtime =
        TweetgateRuntime::start(definitions, platform, store, runtime_options_from_args(args))
            .await
            .context("failed to start services")?;

    tokio::select! {
        reports = runtime.wait_for_subscriptions() => {
            for report in reports {
                warn!(service = %report.service, end = ?report.end, "subscription ended");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
        }
    }

    for status in runtime.statuses() {
        info!(
            service = %status.name,
            cursor = status.cursor,
            pool_size = status.pool_size,
            exhausted = status.exhausted,
            received = status.events_received,
            admitted = status.events_admitted,
            attempts = status.dispatch_attempts,
            recorded = status.actions_recorded,
            "final service status"
        );
    }
    runtime.shutdown();
    Ok(())
}
