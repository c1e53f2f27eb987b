//! Handle to a triggered snapshot
//!
//! Returned by `WorkflowExecutor::trigger_only` for callers that want to
//! trigger now and wait, fetch or poll later.

use chrono::{DateTime, Utc};
use dredge_client::{ClientError, Result};
use dredge_core::{CollectionResult, ResultFormat, SnapshotStatus};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::config::WorkflowConfig;
use crate::repository::DatasetRepository;
use crate::scheduler::SnapshotPoller;

/// A snapshot that has been triggered but not necessarily finished
pub struct SnapshotJob {
    snapshot_id: String,
    dataset_id: String,
    repository: Arc<dyn DatasetRepository>,
    config: WorkflowConfig,
    trigger_sent_at: DateTime<Utc>,
    snapshot_id_received_at: DateTime<Utc>,
    last_status: Option<String>,
}

impl fmt::Debug for SnapshotJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotJob")
            .field("snapshot_id", &self.snapshot_id)
            .field("dataset_id", &self.dataset_id)
            .field("last_status", &self.last_status)
            .finish_non_exhaustive()
    }
}

impl SnapshotJob {
    pub(crate) fn new(
        snapshot_id: String,
        dataset_id: impl Into<String>,
        repository: Arc<dyn DatasetRepository>,
        config: WorkflowConfig,
        trigger_sent_at: DateTime<Utc>,
        snapshot_id_received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            snapshot_id,
            dataset_id: dataset_id.into(),
            repository,
            config,
            trigger_sent_at,
            snapshot_id_received_at,
            last_status: None,
        }
    }

    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn triggered_at(&self) -> DateTime<Utc> {
        self.trigger_sent_at
    }

    /// Last status seen, without a network call
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Current status of the snapshot
    ///
    /// # Arguments
    /// * `refresh` - Query the API even if a status is cached
    pub async fn status(&mut self, refresh: bool) -> Result<String> {
        if !refresh {
            if let Some(status) = &self.last_status {
                return Ok(status.clone());
            }
        }

        let status = self.repository.status(&self.snapshot_id).await?;
        self.last_status = Some(status.clone());
        Ok(status)
    }

    /// Block until the snapshot is ready
    ///
    /// # Returns
    /// The final status string, `ClientError::Timeout` when `timeout` passes
    /// first, or `ClientError::JobFailed` when the job reports a failure
    pub async fn wait(&mut self, timeout: Duration, interval: Duration) -> Result<String> {
        let started = Instant::now();

        loop {
            if started.elapsed() > timeout {
                return Err(ClientError::Timeout(format!(
                    "Snapshot {} not ready after {}s",
                    self.snapshot_id,
                    timeout.as_secs_f64()
                )));
            }

            let status = self.status(true).await?;
            let parsed = SnapshotStatus::parse(&status);

            if parsed == SnapshotStatus::Ready {
                return Ok(status);
            }

            if parsed.is_failure() {
                return Err(ClientError::JobFailed {
                    snapshot_id: self.snapshot_id.clone(),
                    status,
                });
            }

            debug!("Snapshot {} is {}, waiting {:?}", self.snapshot_id, status, interval);
            sleep(interval).await;
        }
    }

    /// Download the snapshot, whatever its status
    pub async fn fetch(&self, format: ResultFormat) -> Result<Value> {
        self.repository.fetch(&self.snapshot_id, format).await
    }

    /// Poll the snapshot to a terminal state and build its result
    ///
    /// Unset arguments fall back to the configuration the job was triggered
    /// with.
    pub async fn to_result(
        &mut self,
        timeout: Option<Duration>,
        interval: Option<Duration>,
    ) -> CollectionResult {
        let timeout = timeout.unwrap_or(self.config.poll_timeout);
        let interval = interval.unwrap_or(self.config.poll_interval);

        let report = SnapshotPoller::new(Arc::clone(&self.repository), interval, timeout)
            .with_format(self.config.format)
            .run(&self.snapshot_id)
            .await;

        let mut result = report
            .into_result(self.config.cost_per_record, timeout)
            .with_snapshot_id(self.snapshot_id.clone())
            .with_dataset_id(self.dataset_id.clone());
        result.trigger_sent_at = Some(self.trigger_sent_at);
        result.snapshot_id_received_at = Some(self.snapshot_id_received_at);

        if result.success {
            self.last_status = Some(SnapshotStatus::Ready.as_str().to_string());
        }
        result
    }
}
