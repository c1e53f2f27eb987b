//! Snapshot poller
//!
//! Polls a snapshot until it is ready, fails or runs out of time.
//!
//! The loop itself (`poll_until_ready`) only sees two injected operations,
//! "read status" and "fetch data", so any remote-job backend can reuse it.
//! `SnapshotPoller` binds it to a `DatasetRepository`.

use chrono::{DateTime, Utc};
use dredge_core::{CollectionResult, ResultFormat, SnapshotStatus};
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::repository::DatasetRepository;

/// Terminal state of a polling loop
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Status reached `ready` and the data was fetched
    Ready(Value),
    /// Status check failed, the job failed, or the fetch failed
    Error(String),
    /// The deadline passed before a terminal status was seen
    Timeout,
}

/// What a polling loop observed
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// One timestamp per status check, failed checks included
    pub polled_at: Vec<DateTime<Utc>>,
}

impl PollReport {
    /// Map the terminal state to a `CollectionResult`
    ///
    /// Fills the polling timestamps and stamps `data_fetched_at` with the
    /// moment of the terminal transition. Trigger-side metadata is left to
    /// the caller.
    pub fn into_result(self, cost_per_record: f64, poll_timeout: Duration) -> CollectionResult {
        let mut result = match self.outcome {
            PollOutcome::Ready(data) => CollectionResult::ready(data, cost_per_record),
            PollOutcome::Error(reason) => CollectionResult::failed(reason),
            PollOutcome::Timeout => CollectionResult::timed_out(poll_timeout),
        };
        result.snapshot_polled_at = self.polled_at;
        result.data_fetched_at = Some(Utc::now());
        result
    }
}

/// Poll until the job is ready, has failed, or `timeout` has elapsed
///
/// The deadline is checked before every status call, so a job can overshoot
/// it by at most one `interval` plus one in-flight round trip. Any status
/// other than `ready`, `error` or `failed` keeps the loop waiting.
///
/// # Arguments
/// * `interval` - Delay between status checks
/// * `timeout` - Deadline measured from the start of the loop
/// * `status` - Reads the current raw status
/// * `fetch` - Downloads the data once the status is `ready`
pub async fn poll_until_ready<S, SFut, F, FFut, E>(
    interval: Duration,
    timeout: Duration,
    mut status: S,
    mut fetch: F,
) -> PollReport
where
    S: FnMut() -> SFut,
    SFut: Future<Output = Result<String, E>>,
    F: FnMut() -> FFut,
    FFut: Future<Output = Result<Value, E>>,
    E: Display,
{
    let started = Instant::now();
    let mut polled_at = Vec::new();

    loop {
        if started.elapsed() > timeout {
            warn!("Polling timed out after {:?}", timeout);
            return PollReport {
                outcome: PollOutcome::Timeout,
                polled_at,
            };
        }

        polled_at.push(Utc::now());

        let raw = match status().await {
            Ok(raw) => raw,
            Err(e) => {
                return PollReport {
                    outcome: PollOutcome::Error(format!("Failed to get status: {e}")),
                    polled_at,
                };
            }
        };

        let parsed = SnapshotStatus::parse(&raw);

        if parsed == SnapshotStatus::Ready {
            let outcome = match fetch().await {
                Ok(data) => PollOutcome::Ready(data),
                Err(e) => PollOutcome::Error(format!("Failed to fetch results: {e}")),
            };
            return PollReport { outcome, polled_at };
        }

        if parsed.is_failure() {
            return PollReport {
                outcome: PollOutcome::Error(format!("Job failed with status: {raw}")),
                polled_at,
            };
        }

        debug!("Status '{}' after {} poll(s), waiting {:?}", raw, polled_at.len(), interval);
        sleep(interval).await;
    }
}

/// Polls snapshots through a dataset repository
#[derive(Clone)]
pub struct SnapshotPoller {
    repository: Arc<dyn DatasetRepository>,
    interval: Duration,
    timeout: Duration,
    format: ResultFormat,
}

impl SnapshotPoller {
    pub fn new(
        repository: Arc<dyn DatasetRepository>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            repository,
            interval,
            timeout,
            format: ResultFormat::Json,
        }
    }

    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.format = format;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the polling loop for one snapshot
    pub async fn run(&self, snapshot_id: &str) -> PollReport {
        info!(
            "Polling snapshot {} (interval: {:?}, timeout: {:?})",
            snapshot_id, self.interval, self.timeout
        );

        let repository = &self.repository;
        let format = self.format;

        let report = poll_until_ready(
            self.interval,
            self.timeout,
            || repository.status(snapshot_id),
            || repository.fetch(snapshot_id, format),
        )
        .await;

        match &report.outcome {
            PollOutcome::Ready(_) => info!(
                "Snapshot {} ready after {} poll(s)",
                snapshot_id,
                report.polled_at.len()
            ),
            PollOutcome::Error(reason) => warn!("Snapshot {} failed: {}", snapshot_id, reason),
            PollOutcome::Timeout => {}
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::scripted::ScriptedRepository;
    use dredge_client::ClientError;
    use serde_json::json;

    fn poller(repo: &Arc<ScriptedRepository>, interval: u64, timeout: u64) -> SnapshotPoller {
        SnapshotPoller::new(
            Arc::clone(repo) as Arc<dyn DatasetRepository>,
            Duration::from_secs(interval),
            Duration::from_secs(timeout),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_progress() {
        let repo = Arc::new(
            ScriptedRepository::new()
                .with_statuses(&["in_progress", "running", "ready"])
                .with_data(json!([{ "a": 1 }])),
        );

        let report = poller(&repo, 1, 60).run("s1").await;

        assert_eq!(report.outcome, PollOutcome::Ready(json!([{ "a": 1 }])));
        assert_eq!(report.polled_at.len(), 3);
        assert_eq!(repo.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_keeps_waiting() {
        let repo = Arc::new(ScriptedRepository::new().with_statuses(&[
            "pending",
            "queued",
            "building",
            "ready",
        ]));

        let report = poller(&repo, 1, 60).run("s1").await;

        assert!(matches!(report.outcome, PollOutcome::Ready(_)));
        assert_eq!(repo.status_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_never_fetches() {
        let repo = Arc::new(ScriptedRepository::new().with_statuses(&["in_progress"]));
        let start = Instant::now();

        let report = poller(&repo, 1, 5).run("s1").await;

        assert_eq!(report.outcome, PollOutcome::Timeout);
        assert_eq!(repo.fetch_calls(), 0);
        // checks at t = 0..=5, deadline noticed at t = 6
        assert_eq!(report.polled_at.len(), 6);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_statuses_skip_fetch() {
        for terminal in ["error", "failed", "FAILED"] {
            let repo = Arc::new(
                ScriptedRepository::new().with_statuses(&["in_progress", terminal]),
            );

            let report = poller(&repo, 1, 60).run("s1").await;

            assert_eq!(
                report.outcome,
                PollOutcome::Error(format!("Job failed with status: {terminal}"))
            );
            assert_eq!(repo.fetch_calls(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_failure_is_terminal_and_recorded() {
        let repo = Arc::new(ScriptedRepository::new().on_status(|_, call| {
            if call == 0 {
                Ok("in_progress".into())
            } else {
                Err(ClientError::Network("connection reset".into()))
            }
        }));

        let report = poller(&repo, 1, 60).run("s1").await;

        match report.outcome {
            PollOutcome::Error(reason) => assert!(reason.starts_with("Failed to get status:")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(report.polled_at.len(), 2);
        assert_eq!(repo.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_is_error() {
        let repo = Arc::new(
            ScriptedRepository::new()
                .on_fetch(|_| Err(ClientError::api_error(404, "snapshot expired"))),
        );

        let report = poller(&repo, 0, 60).run("s1").await;

        match report.outcome {
            PollOutcome::Error(reason) => {
                assert!(reason.starts_with("Failed to fetch results:"));
                assert!(reason.contains("snapshot expired"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generic_loop_with_plain_closures() {
        let mut polls = 0;
        let report = poll_until_ready(
            Duration::ZERO,
            Duration::from_secs(1),
            || {
                polls += 1;
                let status = if polls < 2 { "in_progress" } else { "ready" };
                async move { Ok::<_, String>(status.to_string()) }
            },
            || async { Ok::<_, String>(json!("raw body")) },
        )
        .await;

        assert_eq!(report.outcome, PollOutcome::Ready(json!("raw body")));
        assert_eq!(report.polled_at.len(), 2);
    }

    #[test]
    fn test_report_into_result() {
        let report = PollReport {
            outcome: PollOutcome::Ready(json!([{ "a": 1 }, { "a": 2 }])),
            polled_at: vec![Utc::now(); 3],
        };
        let result = report.into_result(0.001, Duration::from_secs(60));
        assert!(result.success);
        assert_eq!(result.row_count, Some(2));
        assert_eq!(result.poll_count(), 3);
        assert!(result.data_fetched_at.is_some());

        let report = PollReport {
            outcome: PollOutcome::Timeout,
            polled_at: vec![],
        };
        let result = report.into_result(0.001, Duration::from_secs(5));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Polling timeout after 5s"));
        assert!(result.cost.is_none());
    }
}
