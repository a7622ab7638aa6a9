use anyhow::{Context, Result};
use tweetgate_store::EntityStore;

use crate::cli_args::{ActionsCommand, BlacklistCommand};

pub(crate) async fn execute_blacklist_command(
    store: &dyn EntityStore,
    command: &BlacklistCommand,
) -> Result<String> {
    match command {
        BlacklistCommand::Add { screen_name } => {
            let screen_name = screen_name.trim().trim_start_matches('@');
            if screen_name.is_empty() {
                anyhow::bail!("screen name cannot be empty");
            }
            let inserted = store
                .add_to_blacklist(screen_name)
                .await
                .context("failed to add blacklist entry")?;
            Ok(if inserted {
                format!("blacklist add: screen_name={screen_name} inserted=true")
            } else {
                format!("blacklist add: screen_name={screen_name} inserted=false reason=already_present")
            })
        }
        BlacklistCommand::List { json } => {
            let entries = store
                .list_blacklist()
                .await
                .context("failed to list blacklist")?;
            if *json {
                return serde_json::to_string_pretty(&entries)
                    .context("failed to render blacklist json");
            }
            let mut lines = vec![format!("blacklist: entries={}", entries.len())];
            lines.extend(entries.into_iter().map(|entry| format!("- {entry}")));
            Ok(lines.join("\n"))
        }
    }
}

pub(crate) async fn execute_actions_command(
    store: &dyn EntityStore,
    command: &ActionsCommand,
) -> Result<String> {
    match command {
        ActionsCommand::List { service, json } => {
            let records = store
                .list_actions(service.as_deref())
                .await
                .context("failed to list actions")?;
            if *json {
                return serde_json::to_string_pretty(&records)
                    .context("failed to render actions json");
            }
            let mut lines = vec![format!(
                "actions: service={} records={}",
                service.as_deref().unwrap_or("all"),
                records.len()
            )];
            lines.extend(records.into_iter().map(|record| {
                format!(
                    "- {} service={} tweet_id={} author={} account={} text={:?}",
                    record.created_at.to_rfc3339(),
                    record.service,
                    record.tweet_id,
                    record.screen_name,
                    record.account,
                    record.text
                )
            }));
            Ok(lines.join("\n"))
        }
    }
}
