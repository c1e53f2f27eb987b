//! Scheduler layer
//!
//! Drives a triggered snapshot from `in_progress` to a terminal state:
//! status checks on a fixed cadence, a wall-clock deadline, and a single
//! fetch once the snapshot is ready.

pub mod poller;

pub use poller::{PollOutcome, PollReport, SnapshotPoller, poll_until_ready};
