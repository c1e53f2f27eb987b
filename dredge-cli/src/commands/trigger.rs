//! Trigger command
//!
//! Sends a JSON payload file to a dataset. Without `--wait` only the
//! snapshot id is printed, to be picked up later with `dredge snapshot`.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use dredge_client::DatasetClient;
use dredge_core::RequestPayload;
use dredge_runner::WorkflowExecutor;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::scrape::report;
use crate::config::Config;

/// Arguments of `dredge trigger`
#[derive(Args)]
pub struct TriggerArgs {
    /// Dataset identifier
    pub dataset_id: String,

    /// JSON file holding one record object or an array of them
    #[arg(short, long)]
    pub payload: PathBuf,

    /// Poll until the snapshot is ready and print its result
    #[arg(long)]
    pub wait: bool,

    /// Seconds to wait with `--wait`
    #[arg(long)]
    pub poll_timeout: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the result as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Handle `dredge trigger`
pub async fn handle_trigger_command(args: TriggerArgs, config: &Config) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    debug!("Loaded {} record(s) from {}", payload.len(), args.payload.display());

    let engine = config.engine()?;
    let executor = WorkflowExecutor::from_client(DatasetClient::new(engine.clone()), config.workflow()?);
    let _scope = engine.enter()?;

    let mut job = executor.trigger_only(&payload, &args.dataset_id).await?;

    if !args.wait {
        if args.json {
            println!("{}", serde_json::json!({ "snapshot_id": job.snapshot_id() }));
        } else {
            println!(
                "{} {} ({} record(s))",
                "✓ Triggered snapshot".green(),
                job.snapshot_id().bold(),
                payload.len()
            );
            println!(
                "  {}",
                format!("dredge snapshot wait {}", job.snapshot_id()).dimmed()
            );
        }
        return Ok(());
    }

    let result = job
        .to_result(args.poll_timeout.map(Duration::from_secs), None)
        .await;
    report(&[result], args.json, args.output.as_deref())
}

/// Load a request payload from a JSON file
fn read_payload(path: &Path) -> Result<RequestPayload> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    RequestPayload::try_from(value)
        .with_context(|| format!("{} must hold a record object or an array of records", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn payload_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_payload_shapes() {
        let file = payload_file(r#"{"url": "https://a.test/1"}"#);
        assert_eq!(read_payload(file.path()).unwrap().len(), 1);

        let file = payload_file(r#"[{"url": "https://a.test/1"}, {"keyword": "x"}]"#);
        assert_eq!(read_payload(file.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_read_payload_errors() {
        let file = payload_file("not json");
        assert!(read_payload(file.path()).is_err());

        let file = payload_file("[1, 2]");
        let err = read_payload(file.path()).unwrap_err();
        assert!(err.to_string().contains("array of records"));

        assert!(read_payload(Path::new("/nonexistent/payload.json")).is_err());
    }
}
