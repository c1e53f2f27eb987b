//! Scrape command
//!
//! `dredge scrape <platform> <url>...` collects the URLs through the
//! platform registry, as one job or as one job per URL with `--batch`.
//! With `auto` every URL picks its own platform, so each runs as its own
//! concurrent job.

use anyhow::Result;
use clap::Args;
use colored::*;
use dredge_core::CollectionResult;
use dredge_runner::{DatasetRegistry, ScrapeService};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::output;

/// Arguments of `dredge scrape`
#[derive(Args)]
pub struct ScrapeArgs {
    /// Platform key (see `dredge datasets`), or `auto` to pick it from the URL
    pub platform: String,

    /// URLs to collect
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Run one job per URL concurrently instead of a single job
    #[arg(long)]
    pub batch: bool,

    /// Seconds between status checks
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Seconds to wait for the snapshot before giving up
    #[arg(long)]
    pub poll_timeout: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Write results as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Handle `dredge scrape`
pub async fn handle_scrape_command(args: ScrapeArgs, config: &Config) -> Result<()> {
    let engine = config.engine()?;
    let mut workflow = config.workflow()?;
    if let Some(secs) = args.poll_interval {
        workflow = workflow.with_poll_interval(Duration::from_secs(secs));
    }

    let service = ScrapeService::new(engine.clone(), workflow, DatasetRegistry::builtin())
        .with_poll_timeout(args.poll_timeout.map(Duration::from_secs));
    let _scope = engine.enter()?;

    let auto = args.platform.eq_ignore_ascii_case("auto");
    debug!(
        "Scrape command: platform={}, urls={}, batch={}",
        args.platform,
        args.urls.len(),
        args.batch
    );
    if !args.json {
        println!(
            "{} {} URL(s) from {}...",
            "Collecting".cyan(),
            args.urls.len(),
            args.platform.bold()
        );
    }

    let results = match (auto, args.batch, args.urls.as_slice()) {
        (true, _, urls) => service.scrape_each(urls).await?,
        (false, false, [url]) => vec![service.scrape_url(&args.platform, url).await?],
        (false, false, urls) => vec![service.scrape_urls(&args.platform, urls).await?],
        (false, true, urls) => service.scrape_batch(&args.platform, urls).await?,
    };

    report(&results, args.json, args.output.as_deref())
}

/// Shared tail of every collecting command
pub(crate) fn report(results: &[CollectionResult], json: bool, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        output::save(results, path)?;
    }

    if json {
        output::print_json(results)
    } else {
        match results {
            [single] => output::print_result(single),
            many => output::print_results(many),
        }
        Ok(())
    }
}
