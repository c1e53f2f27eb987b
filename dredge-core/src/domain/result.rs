//! Collection result record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::validation::ValidationError;

/// Outcome reported on a `CollectionResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ready,
    Error,
    Timeout,
    InProgress,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::InProgress => "in_progress",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one trigger → poll → fetch workflow
///
/// Created once per workflow invocation (or once per batch item) and handed
/// to the caller as-is. `cost` is only set on success when the number of
/// records is known; `error` is only set on failure. Use the constructors
/// rather than building the struct by hand so both rules hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub success: bool,
    pub status: ResultStatus,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub cost: Option<f64>,
    pub row_count: Option<usize>,
    pub snapshot_id: Option<String>,
    pub dataset_id: Option<String>,
    pub platform: Option<String>,
    /// Source URL, set for single-URL scrapes
    pub url: Option<String>,
    pub trigger_sent_at: Option<DateTime<Utc>>,
    pub snapshot_id_received_at: Option<DateTime<Utc>>,
    pub snapshot_polled_at: Vec<DateTime<Utc>>,
    pub data_fetched_at: Option<DateTime<Utc>>,
}

/// Timing diagnostics derived from a result's timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingBreakdown {
    pub total_elapsed_ms: Option<f64>,
    /// Trigger request sent → snapshot id received
    pub trigger_time_ms: Option<f64>,
    /// Snapshot id received → data fetched
    pub polling_time_ms: Option<f64>,
    pub poll_count: usize,
    pub trigger_sent_at: Option<DateTime<Utc>>,
    pub snapshot_id_received_at: Option<DateTime<Utc>>,
    pub data_fetched_at: Option<DateTime<Utc>>,
}

impl CollectionResult {
    fn empty(success: bool, status: ResultStatus) -> Self {
        Self {
            success,
            status,
            data: None,
            error: None,
            cost: None,
            row_count: None,
            snapshot_id: None,
            dataset_id: None,
            platform: None,
            url: None,
            trigger_sent_at: None,
            snapshot_id_received_at: None,
            snapshot_polled_at: Vec::new(),
            data_fetched_at: None,
        }
    }

    /// Successful result carrying fetched data
    ///
    /// When `data` is a JSON array its length becomes `row_count` and
    /// `cost = row_count * cost_per_record`. Any other shape leaves both unset.
    pub fn ready(data: Value, cost_per_record: f64) -> Self {
        let row_count = data.as_array().map(Vec::len);
        let cost = row_count.map(|rows| rows as f64 * cost_per_record);

        Self {
            data: Some(data),
            row_count,
            cost,
            ..Self::empty(true, ResultStatus::Ready)
        }
    }

    /// Failed result with a description of what went wrong
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(false, ResultStatus::Error)
        }
    }

    /// Failed result for a job that did not finish within `poll_timeout`
    pub fn timed_out(poll_timeout: Duration) -> Self {
        Self {
            error: Some(format!(
                "Polling timeout after {}s",
                poll_timeout.as_secs_f64()
            )),
            ..Self::empty(false, ResultStatus::Timeout)
        }
    }

    pub fn with_snapshot_id(mut self, snapshot_id: impl Into<String>) -> Self {
        self.snapshot_id = Some(snapshot_id.into());
        self
    }

    pub fn with_dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach the four-part workflow timing
    pub fn with_timing(
        mut self,
        trigger_sent_at: Option<DateTime<Utc>>,
        snapshot_id_received_at: Option<DateTime<Utc>>,
        snapshot_polled_at: Vec<DateTime<Utc>>,
        data_fetched_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.trigger_sent_at = trigger_sent_at;
        self.snapshot_id_received_at = snapshot_id_received_at;
        self.snapshot_polled_at = snapshot_polled_at;
        self.data_fetched_at = data_fetched_at;
        self
    }

    /// Pass the data through a normalization hook
    ///
    /// Only applies when the result succeeded and actually carries data.
    pub fn map_data<F>(mut self, normalize: F) -> Self
    where
        F: FnOnce(Value) -> Value,
    {
        if self.success {
            if let Some(data) = self.data.take() {
                self.data = Some(normalize(data));
            }
        }
        self
    }

    /// Collapse a one-element list of records into that record
    ///
    /// Used by single-item callers; any other data shape is left alone.
    pub fn into_single_record(mut self) -> Self {
        if let Some(Value::Array(items)) = &mut self.data {
            if items.len() == 1 {
                self.data = items.pop();
            }
        }
        self
    }

    /// Check the invariants a well-formed result must satisfy
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(cost) = self.cost {
            if cost < 0.0 || !cost.is_finite() {
                return Err(ValidationError::new(format!(
                    "cost must be non-negative, got {cost}"
                )));
            }
            if !self.success {
                return Err(ValidationError::new("cost is only set on successful results"));
            }
        }
        if self.success && self.error.is_some() {
            return Err(ValidationError::new("successful result must not carry an error"));
        }
        if !self.success && self.status == ResultStatus::Ready {
            return Err(ValidationError::new("failed result cannot have status 'ready'"));
        }
        Ok(())
    }

    /// Total time from trigger sent to data fetched, in milliseconds
    pub fn elapsed_ms(&self) -> Option<f64> {
        millis_between(self.trigger_sent_at, self.data_fetched_at)
    }

    /// Number of status checks performed
    pub fn poll_count(&self) -> usize {
        self.snapshot_polled_at.len()
    }

    pub fn timing_breakdown(&self) -> TimingBreakdown {
        TimingBreakdown {
            total_elapsed_ms: self.elapsed_ms(),
            trigger_time_ms: millis_between(self.trigger_sent_at, self.snapshot_id_received_at),
            polling_time_ms: millis_between(self.snapshot_id_received_at, self.data_fetched_at),
            poll_count: self.poll_count(),
            trigger_sent_at: self.trigger_sent_at,
            snapshot_id_received_at: self.snapshot_id_received_at,
            data_fetched_at: self.data_fetched_at,
        }
    }

    /// Serialize the result (timestamps in RFC 3339)
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Write the result as pretty JSON
    ///
    /// The parent directory must already exist.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("parent directory does not exist: {}", parent.display()),
                ));
            }
        }

        let json = self.to_json(true).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

fn millis_between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<f64> {
    let (start, end) = (start?, end?);
    let delta = end.signed_duration_since(start);
    delta.num_microseconds().map(|us| us as f64 / 1000.0)
}

impl fmt::Display for CollectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.success { "✓" } else { "✗" };
        let cost = match self.cost {
            Some(cost) => format!("${cost:.4}"),
            None => "N/A".to_string(),
        };
        let elapsed = match self.elapsed_ms() {
            Some(ms) => format!("{ms:.2}ms"),
            None => "N/A".to_string(),
        };

        write!(
            f,
            "{mark} {} cost={cost} elapsed={elapsed}",
            self.status
        )?;
        if let Some(platform) = &self.platform {
            write!(f, " platform={platform}")?;
        }
        Ok(())
    }
}
