//! Snapshot command handlers
//!
//! Work on snapshots that were triggered earlier, by id.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use dredge_client::DatasetClient;
use dredge_core::{ResultFormat, SnapshotStatus};
use dredge_runner::WorkflowExecutor;
use std::path::PathBuf;
use std::time::Duration;

use super::scrape::report;
use crate::config::Config;
use crate::output;

/// Snapshot subcommands
#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Show the current status of a snapshot
    Status {
        /// Snapshot ID
        id: String,
    },
    /// Download a snapshot as it is now
    Fetch {
        /// Snapshot ID
        id: String,

        /// Result format: json or raw
        #[arg(long, default_value = "json")]
        format: ResultFormat,

        /// Write the data to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Poll a snapshot until it finishes and print its result
    Wait {
        /// Snapshot ID
        id: String,

        /// Seconds to wait before giving up
        #[arg(long)]
        poll_timeout: Option<u64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Write the result as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle snapshot commands
///
/// # Arguments
/// * `command` - The snapshot command to execute
/// * `config` - The CLI configuration
pub async fn handle_snapshot_command(command: SnapshotCommands, config: &Config) -> Result<()> {
    let engine = config.engine()?;
    let client = DatasetClient::new(engine.clone());
    let _scope = engine.enter()?;

    match command {
        SnapshotCommands::Status { id } => show_status(&client, &id).await,
        SnapshotCommands::Fetch { id, format, output } => {
            fetch_snapshot(&client, &id, format, output).await
        }
        SnapshotCommands::Wait {
            id,
            poll_timeout,
            json,
            output,
        } => {
            let executor = WorkflowExecutor::from_client(client, config.workflow()?);
            let result = executor
                .resume(&id, poll_timeout.map(Duration::from_secs))
                .await?;
            report(&[result], json, output.as_deref())
        }
    }
}

/// Print the status of one snapshot
async fn show_status(client: &DatasetClient, id: &str) -> Result<()> {
    let raw = client.get_status(id).await?;
    let status = SnapshotStatus::parse(&raw);

    let colored = if status == SnapshotStatus::Ready {
        raw.green()
    } else if status.is_failure() {
        raw.red()
    } else {
        raw.yellow()
    };

    println!("{} {}", id.bold(), colored);
    Ok(())
}

/// Download a snapshot and print or save it
async fn fetch_snapshot(
    client: &DatasetClient,
    id: &str,
    format: ResultFormat,
    path: Option<PathBuf>,
) -> Result<()> {
    let data = client.fetch_result(id, format).await?;

    match path {
        Some(path) => {
            let text = match &data {
                serde_json::Value::String(raw) => raw.clone(),
                other => serde_json::to_string_pretty(other)?,
            };
            std::fs::write(&path, text)?;
            eprintln!("{} {}", "Saved to".green(), path.display());
        }
        None => output::print_value(&data),
    }

    Ok(())
}
