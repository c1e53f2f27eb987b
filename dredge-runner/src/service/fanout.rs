//! Concurrent fan-out
//!
//! Runs one workflow per batch item, each in its own task. Results come
//! back in input order whatever the completion order, and a failing or
//! panicking item only affects its own slot.

use dredge_client::ClientError;
use dredge_core::CollectionResult;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, info, info_span, warn};

use super::workflow::{WorkflowExecutor, WorkflowRequest};

impl WorkflowExecutor {
    /// Execute every request concurrently
    ///
    /// At most `config.max_concurrency` workflows are in flight when a cap is
    /// set. Errors, including ones `execute` would return as `Err`, become
    /// failed results at the item's position.
    ///
    /// # Returns
    /// One result per request, `result[i]` derived from `requests[i]`
    pub async fn execute_batch(&self, requests: Vec<WorkflowRequest>) -> Vec<CollectionResult> {
        let semaphore = self
            .config()
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        info!(
            "Fanning out {} workflow(s) (max concurrency: {:?})",
            requests.len(),
            self.config().max_concurrency
        );

        let handles: Vec<_> = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| {
                let executor = self.clone();
                let semaphore = semaphore.clone();

                tokio::spawn(
                    async move {
                        let _permit = match semaphore {
                            Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(
                                |_| ClientError::Configuration("fan-out semaphore closed".into()),
                            )?),
                            None => None,
                        };
                        executor.execute(request).await
                    }
                    .instrument(info_span!("batch_item", index)),
                )
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| match joined {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!("Batch item {} failed: {}", index, e);
                    CollectionResult::failed(e.to_string())
                }
                Err(e) => {
                    warn!("Workflow task panicked: {}", e);
                    CollectionResult::failed(format!("Workflow task panicked: {e}"))
                }
            })
            .collect()
    }
}
