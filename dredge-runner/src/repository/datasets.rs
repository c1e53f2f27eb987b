//! Dataset repository
//!
//! Handles communication with the dataset API for job operations:
//! - Triggering a collection
//! - Reading snapshot progress
//! - Downloading a finished snapshot

use async_trait::async_trait;
use dredge_client::{DatasetClient, ErrorKind, Result, RetryPolicy, retry_on_kinds};
use dredge_core::{RequestPayload, ResultFormat};
use serde_json::Value;

/// Repository trait for the trigger / status / fetch primitives
#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// Starts a collection job
    ///
    /// # Returns
    /// The snapshot id, or `None` if the service assigned none
    async fn trigger(
        &self,
        payload: &RequestPayload,
        dataset_id: &str,
        include_errors: bool,
        tag: Option<&str>,
    ) -> Result<Option<String>>;

    /// Reads the raw status string of a snapshot
    async fn status(&self, snapshot_id: &str) -> Result<String>;

    /// Downloads a finished snapshot
    async fn fetch(&self, snapshot_id: &str, format: ResultFormat) -> Result<Value>;
}

/// HTTP implementation of DatasetRepository
///
/// Both retry layers follow `retry`: the client retries responses with a
/// retryable status, and each primitive is retried here when the
/// connection itself fails or times out.
pub struct HttpDatasetRepository {
    client: DatasetClient,
    retry: RetryPolicy,
}

impl HttpDatasetRepository {
    /// Creates a new HTTP dataset repository
    ///
    /// # Arguments
    /// * `client` - Job client bound to a shared engine
    /// * `retry` - Policy applied to each call
    pub fn new(client: DatasetClient, retry: RetryPolicy) -> Self {
        Self {
            client: client.with_retry(retry.clone()),
            retry,
        }
    }

    pub fn client(&self) -> &DatasetClient {
        &self.client
    }
}

#[async_trait]
impl DatasetRepository for HttpDatasetRepository {
    async fn trigger(
        &self,
        payload: &RequestPayload,
        dataset_id: &str,
        include_errors: bool,
        tag: Option<&str>,
    ) -> Result<Option<String>> {
        retry_on_kinds(&self.retry, &ErrorKind::TRANSPORT, || {
            self.client.trigger(payload, dataset_id, include_errors, tag)
        })
        .await
    }

    async fn status(&self, snapshot_id: &str) -> Result<String> {
        retry_on_kinds(&self.retry, &ErrorKind::TRANSPORT, || {
            self.client.get_status(snapshot_id)
        })
        .await
    }

    async fn fetch(&self, snapshot_id: &str, format: ResultFormat) -> Result<Value> {
        retry_on_kinds(&self.retry, &ErrorKind::TRANSPORT, || {
            self.client.fetch_result(snapshot_id, format)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use dredge_client::{Engine, EngineConfig};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn busy_trigger(calls: Arc<AtomicU32>, failures: u32) -> Router {
        Router::new().route(
            "/datasets/v3/trigger",
            post(move || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < failures {
                        (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response()
                    } else {
                        Json(json!({ "snapshot_id": "s1" })).into_response()
                    }
                }
            }),
        )
    }

    async fn repository(router: Router, max_retries: u32) -> HttpDatasetRepository {
        let engine = Engine::new(EngineConfig::new("t").with_base_url(serve(router).await)).unwrap();
        engine.open().unwrap();
        HttpDatasetRepository::new(
            DatasetClient::new(Arc::new(engine)),
            RetryPolicy::default()
                .with_max_retries(max_retries)
                .with_initial_delay(Duration::from_millis(10)),
        )
    }

    fn payload() -> RequestPayload {
        RequestPayload::from_urls(["https://a.test/1"])
    }

    #[tokio::test]
    async fn test_busy_trigger_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let repo = repository(busy_trigger(Arc::clone(&calls), 1), 3).await;

        let id = repo.trigger(&payload(), "gd_test", true, None).await.unwrap();

        assert_eq!(id.as_deref(), Some("s1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_busy_trigger_gives_up_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let repo = repository(busy_trigger(Arc::clone(&calls), u32::MAX), 2).await;

        let err = repo.trigger(&payload(), "gd_test", true, None).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refused_connection_is_retried_per_primitive() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine = Engine::new(EngineConfig::new("t").with_base_url(format!("http://{addr}"))).unwrap();
        engine.open().unwrap();
        let repo = HttpDatasetRepository::new(
            DatasetClient::new(Arc::new(engine)),
            RetryPolicy::default()
                .with_max_retries(1)
                .with_initial_delay(Duration::from_millis(10)),
        );

        let err = repo.status("s1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
