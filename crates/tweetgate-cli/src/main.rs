mod admin_commands;
mod cli_args;
mod run_command;
mod service_config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tweetgate_store::{EntityStore, SqliteEntityStore};

use crate::admin_commands::{execute_actions_command, execute_blacklist_command};
use crate::cli_args::{Cli, CliCommand};
use crate::run_command::execute_run_command;

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn open_store(cli: &Cli) -> Result<Arc<dyn EntityStore>> {
    let store = SqliteEntityStore::open(&cli.db_path)
        .with_context(|| format!("failed to open store {}", cli.db_path.display()))?;
    Ok(Arc::new(store))
}

async fn run_cli(cli: Cli) -> Result<()> {
    let store = open_store(&cli)?;
    match &cli.command {
        CliCommand::Run(args) => execute_run_command(args, store).await,
        CliCommand::Blacklist { command } => {
            println!("{}", execute_blacklist_command(store.as_ref(), command).await?);
            Ok(())
        }
        CliCommand::Actions { command } => {
            println!("{}", execute_actions_command(store.as_ref(), command).await?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    run_cli(Cli::parse()).await
}
