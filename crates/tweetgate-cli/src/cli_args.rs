use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_base_url(value: &str) -> Result<String, String> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err("value must be an http:// or https:// URL".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "tweetgate",
    about = "Keyword stream monitor with credential-failover reactions",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "db-path",
        env = "TWEETGATE_DB_PATH",
        default_value = "actions.db",
        global = true,
        help = "SQLite database holding the blacklist and the action log."
    )]
    pub(crate) db_path: PathBuf,

    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Verify credentials and monitor every enabled service until Ctrl-C.
    Run(RunArgs),
    /// Inspect or extend the opt-out blacklist.
    Blacklist {
        #[command(subcommand)]
        command: BlacklistCommand,
    },
    /// Inspect the executed action log.
    Actions {
        #[command(subcommand)]
        command: ActionsCommand,
    },
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(
        long,
        env = "TWEETGATE_CONFIG",
        help = "JSON service configuration file."
    )]
    pub(crate) config: PathBuf,

    #[arg(
        long = "stop-scan-interval-ms",
        env = "TWEETGATE_STOP_SCAN_INTERVAL_MS",
        default_value_t = 120_000,
        value_parser = parse_positive_u64,
        help = "Interval between STOP mention scans."
    )]
    pub(crate) stop_scan_interval_ms: u64,

    #[arg(
        long = "stop-scan-initial-delay-ms",
        env = "TWEETGATE_STOP_SCAN_INITIAL_DELAY_MS",
        default_value_t = 120_000,
        value_parser = parse_positive_u64,
        help = "Delay before the first STOP mention scan."
    )]
    pub(crate) stop_scan_initial_delay_ms: u64,

    #[arg(
        long = "api-base",
        env = "TWEETGATE_API_BASE",
        default_value = "https://api.twitter.com",
        value_parser = parse_base_url,
        help = "Base URL for REST endpoints."
    )]
    pub(crate) api_base: String,

    #[arg(
        long = "stream-base",
        env = "TWEETGATE_STREAM_BASE",
        default_value = "https://stream.twitter.com",
        value_parser = parse_base_url,
        help = "Base URL for the filtered stream endpoint."
    )]
    pub(crate) stream_base: String,

    #[arg(
        long = "request-timeout-ms",
        env = "TWEETGATE_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for REST calls. The stream connection has no timeout."
    )]
    pub(crate) request_timeout_ms: u64,
}

#[derive(Debug, Subcommand)]
pub(crate) enum BlacklistCommand {
    /// Add a screen name; adding an existing entry is a no-op.
    Add { screen_name: String },
    List {
        #[arg(long, help = "Print entries as a JSON array.")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum ActionsCommand {
    List {
        #[arg(long, help = "Only show actions executed for this service.")]
        service: Option<String>,
        #[arg(long, help = "Print records as a JSON array.")]
        json: bool,
    },
}
