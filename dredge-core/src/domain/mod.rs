//! Core domain types
//!
//! These types describe a remote collection job as seen from the client:
//! the status vocabulary reported while a snapshot is being computed, and the
//! result record handed back to callers once a workflow finishes.

pub mod result;
pub mod snapshot;
