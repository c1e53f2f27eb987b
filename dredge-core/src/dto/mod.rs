//! Data Transfer Objects
//!
//! Request and response bodies exchanged with the remote dataset API.

pub mod dataset;
