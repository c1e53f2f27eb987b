//! Dredge Runner
//!
//! Orchestration of remote collection jobs on top of `dredge-client`:
//! trigger a snapshot, poll it until it is ready, fetch it, and report the
//! outcome as a `CollectionResult`.
//!
//! # Example
//!
//! ```no_run
//! use dredge_client::{Engine, EngineConfig};
//! use dredge_runner::{DatasetRegistry, ScrapeService, WorkflowConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Arc::new(Engine::new(EngineConfig::from_env()?)?);
//!     let _scope = engine.enter()?;
//!
//!     let service = ScrapeService::new(
//!         Arc::clone(&engine),
//!         WorkflowConfig::from_env()?,
//!         DatasetRegistry::builtin(),
//!     );
//!     let result = service.scrape("https://www.amazon.com/dp/B0001").await?;
//!
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod job;
pub mod registry;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use config::WorkflowConfig;
pub use job::SnapshotJob;
pub use registry::{DatasetRegistry, PlatformSpec};
pub use repository::{DatasetRepository, HttpDatasetRepository};
pub use scheduler::{PollOutcome, PollReport, SnapshotPoller, poll_until_ready};
pub use service::{Normalizer, ScrapeService, WorkflowExecutor, WorkflowRequest};
