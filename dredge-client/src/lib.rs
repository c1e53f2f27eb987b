//! Dredge HTTP Client
//!
//! Transport layer for the remote dataset API: a pooled, authenticated,
//! rate-limited HTTP engine, retry helpers, and the three job primitives
//! (trigger, progress, snapshot) built on top of it.
//!
//! # Example
//!
//! ```no_run
//! use dredge_client::{DatasetClient, Engine, EngineConfig};
//! use dredge_core::RequestPayload;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> dredge_client::Result<()> {
//!     let engine = Arc::new(Engine::new(EngineConfig::from_env()?)?);
//!     let _scope = engine.enter()?;
//!
//!     let client = DatasetClient::new(Arc::clone(&engine));
//!     let payload = RequestPayload::from_urls(["https://www.amazon.com/dp/B0001"]);
//!     let snapshot_id = client.trigger(&payload, "gd_l7q7dkf244hwxbl93", true, None).await?;
//!
//!     println!("Triggered snapshot: {:?}", snapshot_id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod datasets;
pub mod engine;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod ssl;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{EngineConfig, RateLimit};
pub use datasets::{DatasetClient, Endpoints};
pub use engine::{Engine, EngineScope, RequestOptions};
pub use error::{ClientError, ErrorKind, RETRYABLE_STATUSES, Result};
pub use retry::{RetryPolicy, retry_on_kinds, retry_on_status, retry_with_backoff};
