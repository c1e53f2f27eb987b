//! Retry with exponential backoff
//!
//! Two flavours:
//! - `retry_with_backoff` / `retry_on_kinds` retry an operation that fails
//!   with an error the caller considers retryable.
//! - `retry_on_status` retries calls whose *response* carries a retryable
//!   status code even though the call itself succeeded, with ±10% jitter.
//!   `DatasetClient` sends every request through it.

use rand::Rng;
use reqwest::Response;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::error::{ClientError, ErrorKind, RETRYABLE_STATUSES, Result};

/// Backoff settings shared by every retry helper
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Add ±10% random jitter to every delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Un-jittered delay before retry number `attempt + 1`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn wait_for(&self, attempt: u32, force_jitter: bool) -> Duration {
        let delay = self.backoff_delay(attempt);
        if self.jitter || force_jitter {
            jittered(delay)
        } else {
            delay
        }
    }
}

/// Scale a delay by a random factor in [0.9, 1.1]
pub fn jittered(delay: Duration) -> Duration {
    let factor = 1.0 + rand::thread_rng().gen_range(-0.1..=0.1);
    delay.mul_f64(factor)
}

/// Retry `operation` while `should_retry` accepts the error
///
/// Non-retryable errors are returned immediately. After the last allowed
/// attempt the last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !should_retry(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }

                let wait = policy.wait_for(attempt, false);
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt + 1,
                    policy.max_retries + 1,
                    err,
                    wait
                );
                sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// Retry a client call whose error kind is in `kinds`
///
/// API errors are only retried when their status is one of
/// `RETRYABLE_STATUSES`, even if `ErrorKind::Api` is listed.
pub async fn retry_on_kinds<T, F, Fut>(
    policy: &RetryPolicy,
    kinds: &[ErrorKind],
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(
        policy,
        |err: &ClientError| {
            kinds.contains(&err.kind())
                && (err.kind() != ErrorKind::Api || err.has_status_in(&RETRYABLE_STATUSES))
        },
        operation,
    )
    .await
}

/// Retry a request while its response status is in `statuses`
///
/// Errors are returned as they are; transport failures are left to an
/// outer `retry_on_kinds`. Delays always carry ±10% jitter. When retries run
/// out on a retryable status the response is turned into `ClientError::Api`.
pub async fn retry_on_status<F, Fut>(
    policy: &RetryPolicy,
    statuses: &[u16],
    mut operation: F,
) -> Result<Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let mut attempt = 0;

    loop {
        let outcome = operation().await;

        let response = match outcome {
            Ok(response) if statuses.contains(&response.status().as_u16()) => response,
            other => return other,
        };
        let status = response.status().as_u16();

        if attempt >= policy.max_retries {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(
                status,
                format!("Server error after {} retries: {}", policy.max_retries, text),
            ));
        }

        drop(response);
        let wait = policy.wait_for(attempt, true);
        warn!(
            "Request attempt {}/{} got HTTP {}; retrying in {:?}",
            attempt + 1,
            policy.max_retries + 1,
            status,
            wait
        );
        sleep(wait).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::{Router, http::StatusCode, routing::get};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(10))
    }

    async fn flaky(calls: &AtomicU32, failures: u32) -> Result<&'static str> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            Err(ClientError::Network("connection reset".into()))
        } else {
            Ok("done")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_k_failures() {
        for k in 0..3 {
            let calls = AtomicU32::new(0);
            let result = retry_on_kinds(&fast_policy(3), &ErrorKind::DEFAULT_RETRYABLE, || {
                flaky(&calls, k)
            })
            .await;

            assert_eq!(result.unwrap(), "done");
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result =
            retry_on_kinds(&fast_policy(3), &ErrorKind::DEFAULT_RETRYABLE, || flaky(&calls, 10))
                .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_is_raised_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_on_kinds(&fast_policy(3), &ErrorKind::DEFAULT_RETRYABLE, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::Authentication("401".into())) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Authentication);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_error_retried_only_for_retryable_status() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_on_kinds(&fast_policy(3), &[ErrorKind::Api], || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::api_error(404, "missing")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_on_kinds(&fast_policy(2), &[ErrorKind::Api], || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::api_error(502, "bad gateway")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_grow_and_cap() {
        let policy = RetryPolicy::default()
            .with_max_retries(4)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let _ = retry_with_backoff(&policy, |_: &String| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("nope".to_string()) }
        })
        .await;

        // 1 + 2 + 3 + 3
        assert_eq!(start.elapsed(), Duration::from_secs(9));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_backoff_delay_and_jitter_bounds() {
        let policy = RetryPolicy::default().with_backoff_factor(1.5);
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs_f64(2.25));
        assert_eq!(policy.backoff_delay(100), Duration::from_secs(60));

        for _ in 0..100 {
            let d = jittered(Duration::from_secs(10));
            assert!(d >= Duration::from_secs(9) && d <= Duration::from_secs(11));
        }
    }

    fn status_router(calls: Arc<AtomicU32>, failures: u32, status: StatusCode) -> Router {
        Router::new().route(
            "/",
            get(move || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < failures {
                        (status, "busy")
                    } else {
                        (StatusCode::OK, "ok")
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_retry_on_status_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let base = spawn_server(status_router(
            Arc::clone(&calls),
            2,
            StatusCode::SERVICE_UNAVAILABLE,
        ))
        .await;
        let client = reqwest::Client::new();

        let response = retry_on_status(&fast_policy(3), &RETRYABLE_STATUSES, || async {
            client
                .get(&base)
                .send()
                .await
                .map_err(|e| ClientError::from_transport(e, Duration::from_secs(30)))
        })
        .await
        .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_on_status_exhausted_becomes_api_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let base = spawn_server(status_router(
            Arc::clone(&calls),
            u32::MAX,
            StatusCode::TOO_MANY_REQUESTS,
        ))
        .await;
        let client = reqwest::Client::new();

        let err = retry_on_status(&fast_policy(2), &RETRYABLE_STATUSES, || async {
            client
                .get(&base)
                .send()
                .await
                .map_err(|e| ClientError::from_transport(e, Duration::from_secs(30)))
        })
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("after 2 retries"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_on_status_leaves_transport_errors_alone() {
        let calls = AtomicU32::new(0);

        let err = retry_on_status(&fast_policy(3), &RETRYABLE_STATUSES, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Response, _>(ClientError::Network("connection reset".into()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
