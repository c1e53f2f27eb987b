//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod datasets;
mod scrape;
mod snapshot;
mod trigger;

pub use scrape::ScrapeArgs;
pub use snapshot::SnapshotCommands;
pub use trigger::TriggerArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Scrape URLs of a registered platform
    Scrape(ScrapeArgs),
    /// Trigger a collection on a dataset from a JSON payload file
    Trigger(TriggerArgs),
    /// Inspect, wait for or download an existing snapshot
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// List the registered platforms
    Datasets,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Scrape(args) => scrape::handle_scrape_command(args, config).await,
        Commands::Trigger(args) => trigger::handle_trigger_command(args, config).await,
        Commands::Snapshot { command } => snapshot::handle_snapshot_command(command, config).await,
        Commands::Datasets => datasets::list_datasets(),
    }
}
