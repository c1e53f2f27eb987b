//! Service layer
//!
//! Services hold the workflow logic. They drive repositories through the
//! scheduler and turn the outcome into `CollectionResult` values:
//! - `workflow`: trigger → poll → fetch for one request
//! - `fanout`: one concurrent workflow per batch item
//! - `scrape`: URL-level entry points over the platform registry

mod fanout;
mod scrape;
mod workflow;

pub use scrape::ScrapeService;
pub use workflow::{Normalizer, WorkflowExecutor, WorkflowRequest};
