//! Dataset job endpoints
//!
//! The three primitives of the remote job protocol: trigger a collection,
//! read its progress and download its snapshot. Responses with a retryable
//! status (429, 5xx) are retried under the client's `RetryPolicy`; each call
//! is otherwise independent so callers can add their own retries around it.

use dredge_core::dto::dataset::{ProgressResponse, TriggerResponse};
use dredge_core::{RequestPayload, ResultFormat};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::{Engine, RequestOptions};
use crate::error::{ClientError, RETRYABLE_STATUSES, Result};
use crate::retry::{RetryPolicy, retry_on_status};

/// Endpoint paths of the dataset API, relative to the engine base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub trigger: String,
    pub progress: String,
    pub snapshot: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            trigger: "/datasets/v3/trigger".to_string(),
            progress: "/datasets/v3/progress".to_string(),
            snapshot: "/datasets/v3/snapshot".to_string(),
        }
    }
}

/// Remote job client for the dataset API
#[derive(Debug, Clone)]
pub struct DatasetClient {
    engine: Arc<Engine>,
    endpoints: Endpoints,
    retry: RetryPolicy,
}

impl DatasetClient {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self::with_endpoints(engine, Endpoints::default())
    }

    pub fn with_endpoints(engine: Arc<Engine>, endpoints: Endpoints) -> Self {
        Self {
            engine,
            endpoints,
            retry: RetryPolicy::none(),
        }
    }

    /// Retry responses with a retryable status under `retry`
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn send(&self, method: Method, endpoint: &str, options: RequestOptions) -> Result<Response> {
        if self.retry.max_retries == 0 {
            return self.engine.request(method, endpoint, options).await;
        }

        retry_on_status(&self.retry, &RETRYABLE_STATUSES, || {
            self.engine.request(method.clone(), endpoint, options.clone())
        })
        .await
    }

    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Start a collection job
    ///
    /// # Arguments
    /// * `payload` - One record per item to collect
    /// * `dataset_id` - Collection template to run
    /// * `include_errors` - Ask the service to keep per-record errors in the snapshot
    /// * `tag` - Optional caller tag forwarded as the `sdk_function` parameter
    ///
    /// # Returns
    /// The snapshot id, or `None` when the service accepted the request
    /// without assigning one
    pub async fn trigger(
        &self,
        payload: &RequestPayload,
        dataset_id: &str,
        include_errors: bool,
        tag: Option<&str>,
    ) -> Result<Option<String>> {
        let body = serde_json::to_value(payload)
            .map_err(|e| ClientError::Parse(format!("Failed to encode payload: {e}")))?;

        let mut options = RequestOptions::new()
            .json(body)
            .query("dataset_id", dataset_id)
            .query("include_errors", if include_errors { "true" } else { "false" });
        if let Some(tag) = tag {
            options = options.query("sdk_function", tag);
        }

        let response = self.send(Method::POST, &self.endpoints.trigger, options).await?;
        let status = response.status();

        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            warn!("Trigger for dataset {} rejected with {}", dataset_id, status);
            return Err(ClientError::api_error(status.as_u16(), text));
        }

        let body: TriggerResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse trigger response: {e}")))?;

        match &body.snapshot_id {
            Some(id) => info!(
                "Triggered dataset {} ({} records) as snapshot {}",
                dataset_id,
                payload.len(),
                id
            ),
            None => warn!("Trigger for dataset {} returned no snapshot id", dataset_id),
        }

        Ok(body.snapshot_id)
    }

    /// Read the progress of a snapshot
    ///
    /// A non-200 answer is reported as the status `"error"` rather than an
    /// `Err`, so the polling loop handles it like any other failed job. A
    /// body without a status field reads as `"unknown"`.
    pub async fn get_status(&self, snapshot_id: &str) -> Result<String> {
        let endpoint = format!("{}/{}", self.endpoints.progress, snapshot_id);
        let response = match self.send(Method::GET, &endpoint, RequestOptions::new()).await {
            Err(ClientError::Api { status, .. }) => {
                debug!("Progress for {} kept returning {}", snapshot_id, status);
                return Ok("error".to_string());
            }
            other => other?,
        };
        let status = response.status();

        if status != StatusCode::OK {
            debug!("Progress for {} returned {}", snapshot_id, status);
            return Ok("error".to_string());
        }

        let body: ProgressResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse progress response: {e}")))?;

        Ok(body.status.unwrap_or_else(|| "unknown".to_string()))
    }

    /// Download a finished snapshot
    ///
    /// # Returns
    /// Parsed JSON for `ResultFormat::Json`, the body as a JSON string for
    /// `ResultFormat::Raw`
    pub async fn fetch_result(&self, snapshot_id: &str, format: ResultFormat) -> Result<Value> {
        let endpoint = format!("{}/{}", self.endpoints.snapshot, snapshot_id);
        let options = RequestOptions::new().query("format", format.as_str());
        let response = self.send(Method::GET, &endpoint, options).await?;
        let status = response.status();

        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), text));
        }

        match format {
            ResultFormat::Json => response
                .json()
                .await
                .map_err(|e| ClientError::Parse(format!("Failed to parse snapshot: {e}"))),
            ResultFormat::Raw => response
                .text()
                .await
                .map(Value::String)
                .map_err(|e| ClientError::from_transport(e, self.engine.config().request_timeout)),
        }
    }
}
