//! Repository layer
//!
//! Repositories wrap the remote job primitives behind a trait so the
//! polling loop and the workflow executor can run against the live API or
//! against an in-memory script in tests.

mod datasets;

pub use datasets::{DatasetRepository, HttpDatasetRepository};

#[cfg(test)]
pub(crate) mod scripted;
