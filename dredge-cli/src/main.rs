//! Dredge CLI
//!
//! Command-line interface for triggering, polling and fetching remote
//! dataset collections.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use dredge_client::config::{DEFAULT_BASE_URL, DEFAULT_RATE_LIMIT};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dredge")]
#[command(about = "Remote dataset collection CLI", long_about = None)]
struct Cli {
    /// API bearer token
    #[arg(long, env = "DREDGE_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// API base URL
    #[arg(long, env = "DREDGE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "DREDGE_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    /// Requests per second across all jobs (0 disables limiting)
    #[arg(long, env = "DREDGE_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT)]
    rate_limit: u32,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dredge=info,dredge_runner=info,dredge_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        token: cli.token,
        base_url: cli.base_url,
        request_timeout: Duration::from_secs(cli.request_timeout),
        rate_limit: cli.rate_limit,
    };

    handle_command(cli.command, &config).await
}
