//! Snapshot status vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a remote snapshot as reported by the progress endpoint
///
/// The remote service does not publish its full vocabulary. Only `ready`,
/// `error` and `failed` end polling; every other value, including ones this
/// enum has never seen, is kept in `Other` and treated as still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SnapshotStatus {
    Triggered,
    InProgress,
    Ready,
    Error,
    Failed,
    Timeout,
    Other(String),
}

impl SnapshotStatus {
    /// Parse a raw status string
    ///
    /// Matching is exact: `READY` is not `ready` and keeps polling.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "triggered" => Self::Triggered,
            "in_progress" | "running" => Self::InProgress,
            "ready" => Self::Ready,
            "error" => Self::Error,
            "failed" => Self::Failed,
            "timeout" => Self::Timeout,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Wire representation of this status
    pub fn as_str(&self) -> &str {
        match self {
            Self::Triggered => "triggered",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the remote job has finished, successfully or not
    ///
    /// `Timeout` is a client-side verdict and never comes from the progress
    /// endpoint, so it does not stop a polling loop on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error | Self::Failed)
    }

    /// Whether the remote job reported a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Failed)
    }
}

impl From<String> for SnapshotStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for SnapshotStatus {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<SnapshotStatus> for String {
    fn from(status: SnapshotStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
