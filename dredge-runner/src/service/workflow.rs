//! Workflow executor
//!
//! Trigger a collection, poll its snapshot and turn the outcome into a
//! `CollectionResult`. Ordinary remote failures come back as failed results;
//! only authentication, configuration and validation errors are returned as
//! `Err`.

use chrono::Utc;
use dredge_client::{ClientError, DatasetClient, Result};
use dredge_core::validation::{validate_dataset_id, validate_poll_timeout};
use dredge_core::{CollectionResult, RequestPayload, ResultFormat, ResultStatus, ValidationError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, error, field, info, info_span, warn};
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::job::SnapshotJob;
use crate::repository::{DatasetRepository, HttpDatasetRepository};
use crate::scheduler::SnapshotPoller;

/// Hook applied to the data of a successful result
pub type Normalizer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// One workflow invocation
///
/// Unset fields fall back to the executor's `WorkflowConfig`.
#[derive(Clone)]
pub struct WorkflowRequest {
    pub payload: RequestPayload,
    pub dataset_id: String,
    pub poll_interval: Option<Duration>,
    pub poll_timeout: Option<Duration>,
    pub include_errors: Option<bool>,
    pub cost_per_record: Option<f64>,
    pub format: Option<ResultFormat>,
    /// Caller tag forwarded with the trigger call
    pub tag: Option<String>,
    /// Platform label copied onto the result
    pub platform: Option<String>,
    pub normalize: Option<Normalizer>,
}

impl fmt::Debug for WorkflowRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRequest")
            .field("records", &self.payload.len())
            .field("dataset_id", &self.dataset_id)
            .field("poll_interval", &self.poll_interval)
            .field("poll_timeout", &self.poll_timeout)
            .field("platform", &self.platform)
            .field("normalize", &self.normalize.is_some())
            .finish_non_exhaustive()
    }
}

impl WorkflowRequest {
    pub fn new(payload: RequestPayload, dataset_id: impl Into<String>) -> Self {
        Self {
            payload,
            dataset_id: dataset_id.into(),
            poll_interval: None,
            poll_timeout: None,
            include_errors: None,
            cost_per_record: None,
            format: None,
            tag: None,
            platform: None,
            normalize: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    pub fn with_include_errors(mut self, include_errors: bool) -> Self {
        self.include_errors = Some(include_errors);
        self
    }

    pub fn with_cost_per_record(mut self, cost: f64) -> Self {
        self.cost_per_record = Some(cost);
        self
    }

    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_normalizer<F>(mut self, normalize: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.normalize = Some(Arc::new(normalize));
        self
    }

    fn settings(&self, config: &WorkflowConfig) -> Settings {
        let defaults = Settings::from(config);
        Settings {
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            poll_timeout: self.poll_timeout.unwrap_or(defaults.poll_timeout),
            include_errors: self.include_errors.unwrap_or(defaults.include_errors),
            cost_per_record: self.cost_per_record.unwrap_or(defaults.cost_per_record),
            format: self.format.unwrap_or(defaults.format),
        }
    }
}

/// Effective settings of one invocation
#[derive(Debug, Clone, Copy)]
struct Settings {
    poll_interval: Duration,
    poll_timeout: Duration,
    include_errors: bool,
    cost_per_record: f64,
    format: ResultFormat,
}

impl From<&WorkflowConfig> for Settings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            poll_timeout: config.poll_timeout,
            include_errors: config.include_errors,
            cost_per_record: config.cost_per_record,
            format: config.format,
        }
    }
}

/// Runs trigger → poll → fetch workflows against a dataset repository
///
/// Cloning is cheap; clones share the repository.
#[derive(Clone)]
pub struct WorkflowExecutor {
    repository: Arc<dyn DatasetRepository>,
    config: WorkflowConfig,
}

impl WorkflowExecutor {
    pub fn new(repository: Arc<dyn DatasetRepository>, config: WorkflowConfig) -> Self {
        Self { repository, config }
    }

    /// Executor over the live API, retrying each primitive per `config.retry`
    pub fn from_client(client: DatasetClient, config: WorkflowConfig) -> Self {
        let repository = HttpDatasetRepository::new(client, config.retry.clone());
        Self::new(Arc::new(repository), config)
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn DatasetRepository> {
        &self.repository
    }

    /// Run one complete workflow
    ///
    /// # Returns
    /// A `CollectionResult` for every remote outcome, or `Err` for invalid
    /// input and authentication or configuration failures
    pub async fn execute(&self, request: WorkflowRequest) -> Result<CollectionResult> {
        let settings = request.settings(&self.config);
        validate_dataset_id(&request.dataset_id)?;
        validate_poll_timeout(settings.poll_timeout)?;
        if request.payload.is_empty() {
            return Err(ValidationError::new("payload must contain at least one record").into());
        }

        let span = info_span!(
            "workflow",
            workflow_id = %Uuid::new_v4(),
            dataset_id = %request.dataset_id,
            snapshot_id = field::Empty,
        );

        self.run(request, settings, span.clone())
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        request: WorkflowRequest,
        settings: Settings,
        span: Span,
    ) -> Result<CollectionResult> {
        info!("Triggering collection of {} record(s)", request.payload.len());

        let trigger_sent_at = Utc::now();
        let triggered = self
            .repository
            .trigger(
                &request.payload,
                &request.dataset_id,
                settings.include_errors,
                request.tag.as_deref(),
            )
            .await;

        let failure = match triggered {
            Ok(Some(snapshot_id)) => {
                let received_at = Utc::now();
                span.record("snapshot_id", snapshot_id.as_str());

                let mut result = self
                    .poll(&snapshot_id, settings)
                    .await
                    .with_snapshot_id(snapshot_id);
                result.trigger_sent_at = Some(trigger_sent_at);
                result.snapshot_id_received_at = Some(received_at);

                return Ok(finish(result, &request));
            }
            Ok(None) => "Failed to trigger scrape - no snapshot_id returned".to_string(),
            Err(e) if e.is_fatal() => {
                error!("Trigger rejected: {}", e);
                return Err(e);
            }
            Err(e) => format!("Trigger failed: {e}"),
        };

        let mut result = CollectionResult::failed(failure);
        result.trigger_sent_at = Some(trigger_sent_at);
        result.data_fetched_at = Some(Utc::now());
        Ok(finish(result, &request))
    }

    async fn poll(&self, snapshot_id: &str, settings: Settings) -> CollectionResult {
        SnapshotPoller::new(
            Arc::clone(&self.repository),
            settings.poll_interval,
            settings.poll_timeout,
        )
        .with_format(settings.format)
        .run(snapshot_id)
        .await
        .into_result(settings.cost_per_record, settings.poll_timeout)
    }

    /// Re-poll an already triggered snapshot without triggering again
    ///
    /// Used to pick up a job whose earlier workflow timed out. Timing starts
    /// at the first poll; trigger timestamps stay unset.
    pub async fn resume(
        &self,
        snapshot_id: &str,
        poll_timeout: Option<Duration>,
    ) -> Result<CollectionResult> {
        if snapshot_id.trim().is_empty() {
            return Err(ValidationError::new("snapshot_id cannot be empty").into());
        }

        let mut settings = Settings::from(&self.config);
        if let Some(timeout) = poll_timeout {
            settings.poll_timeout = timeout;
        }
        validate_poll_timeout(settings.poll_timeout)?;

        let span = info_span!(
            "resume",
            workflow_id = %Uuid::new_v4(),
            snapshot_id = %snapshot_id,
        );

        let result = self
            .poll(snapshot_id, settings)
            .instrument(span)
            .await
            .with_snapshot_id(snapshot_id);
        Ok(result)
    }

    /// Trigger a collection and hand back the job without waiting
    ///
    /// Every trigger failure is returned as `Err`; a trigger answer without
    /// a snapshot id is a `ClientError::Parse`.
    pub async fn trigger_only(
        &self,
        payload: &RequestPayload,
        dataset_id: &str,
    ) -> Result<SnapshotJob> {
        validate_dataset_id(dataset_id)?;
        if payload.is_empty() {
            return Err(ValidationError::new("payload must contain at least one record").into());
        }

        let trigger_sent_at = Utc::now();
        let snapshot_id = self
            .repository
            .trigger(payload, dataset_id, self.config.include_errors, None)
            .await?
            .ok_or_else(|| {
                ClientError::Parse("trigger response did not include a snapshot_id".into())
            })?;

        info!("Triggered snapshot {} for dataset {}", snapshot_id, dataset_id);

        Ok(SnapshotJob::new(
            snapshot_id,
            dataset_id,
            Arc::clone(&self.repository),
            self.config.clone(),
            trigger_sent_at,
            Utc::now(),
        ))
    }
}

fn finish(result: CollectionResult, request: &WorkflowRequest) -> CollectionResult {
    let mut result = result
        .with_dataset_id(request.dataset_id.clone())
        .with_platform(request.platform.clone());

    if let Some(normalize) = &request.normalize {
        result = result.map_data(|data| normalize(data));
    }

    match result.status {
        ResultStatus::Ready => info!(
            "Collected {} record(s) in {:.0}ms",
            result.row_count.map_or_else(|| "?".to_string(), |n| n.to_string()),
            result.elapsed_ms().unwrap_or_default()
        ),
        ResultStatus::Timeout => warn!(
            "{}",
            result.error.as_deref().unwrap_or("Polling timed out")
        ),
        _ => error!(
            "Workflow failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }

    result
}
