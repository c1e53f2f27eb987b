//! Dredge Core
//!
//! Core types shared by every dredge crate.
//!
//! This crate contains:
//! - Domain types: snapshot statuses and the `CollectionResult` record
//! - DTOs: wire shapes of the remote dataset API and the request payload
//! - Validation: pre-flight input checks that run before any network call

pub mod domain;
pub mod dto;
pub mod validation;

pub use domain::result::{CollectionResult, ResultStatus, TimingBreakdown};
pub use domain::snapshot::SnapshotStatus;
pub use dto::dataset::{Record, RequestPayload, ResultFormat};
pub use validation::ValidationError;
