//! URL scrape service
//!
//! Turns "collect these URLs from that platform" into workflow requests
//! using the platform registry. Every operation has a native async form
//! and a `*_blocking` form for synchronous callers.

use dredge_client::{ClientError, DatasetClient, Engine, Result};
use dredge_core::validation::{validate_url, validate_url_list};
use dredge_core::{CollectionResult, RequestPayload, ValidationError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::WorkflowConfig;
use crate::registry::{DatasetRegistry, PlatformSpec};
use crate::service::workflow::{WorkflowExecutor, WorkflowRequest};

/// Scrapes URLs of registered platforms
pub struct ScrapeService {
    executor: WorkflowExecutor,
    registry: Arc<DatasetRegistry>,
    engine: Option<Arc<Engine>>,
    poll_timeout: Option<Duration>,
}

impl ScrapeService {
    /// Service over the live API
    ///
    /// The engine is shared; async callers keep it open around their calls,
    /// blocking calls open and close it themselves.
    pub fn new(engine: Arc<Engine>, config: WorkflowConfig, registry: DatasetRegistry) -> Self {
        let executor = WorkflowExecutor::from_client(DatasetClient::new(Arc::clone(&engine)), config);
        Self {
            executor,
            registry: Arc::new(registry),
            engine: Some(engine),
            poll_timeout: None,
        }
    }

    /// Service over an existing executor, with no engine to manage
    pub fn with_executor(executor: WorkflowExecutor, registry: DatasetRegistry) -> Self {
        Self {
            executor,
            registry: Arc::new(registry),
            engine: None,
            poll_timeout: None,
        }
    }

    /// Use one poll deadline for every platform instead of the registry's
    pub fn with_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn executor(&self) -> &WorkflowExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    fn request_for(&self, platform: &str, payload: RequestPayload, tag: &str) -> Result<WorkflowRequest> {
        let key = platform.trim().to_ascii_lowercase();
        let spec: &PlatformSpec = self.registry.require(&key)?;

        Ok(WorkflowRequest::new(payload, spec.dataset_id.clone())
            .with_poll_timeout(self.poll_timeout.unwrap_or(spec.poll_timeout))
            .with_cost_per_record(spec.cost_per_record)
            .with_tag(format!("{key}_{tag}"))
            .with_platform(key))
    }

    /// Scrape one URL
    ///
    /// A single-record response is collapsed into that record.
    pub async fn scrape_url(&self, platform: &str, url: &str) -> Result<CollectionResult> {
        validate_url(url)?;
        let request = self.request_for(platform, RequestPayload::from_urls([url]), "scrape_url")?;

        let result = self.executor.execute(request).await?;
        Ok(result.with_url(url).into_single_record())
    }

    /// Scrape one URL, picking the platform from its host
    pub async fn scrape(&self, url: &str) -> Result<CollectionResult> {
        validate_url(url)?;
        let platform = self
            .registry
            .resolve_url(url)
            .ok_or_else(|| ValidationError::new(format!("no platform registered for URL: {url}")))?
            .to_string();

        debug!("Resolved {} to platform {}", url, platform);
        self.scrape_url(&platform, url).await
    }

    /// Scrape several URLs as one job
    pub async fn scrape_urls<S: AsRef<str>>(
        &self,
        platform: &str,
        urls: &[S],
    ) -> Result<CollectionResult> {
        validate_url_list(urls)?;
        let payload = RequestPayload::from_urls(urls.iter().map(|url| {
            let url: &str = url.as_ref();
            url.to_string()
        }));
        let request = self.request_for(platform, payload, "scrape_urls")?;

        self.executor.execute(request).await
    }

    /// Scrape several URLs as one concurrent job per URL
    ///
    /// # Returns
    /// One result per URL, in input order. Per-URL failures are failed
    /// results; only invalid input is an `Err`.
    pub async fn scrape_batch<S: AsRef<str>>(
        &self,
        platform: &str,
        urls: &[S],
    ) -> Result<Vec<CollectionResult>> {
        validate_url_list(urls)?;

        let requests = urls
            .iter()
            .map(|url| {
                let url: &str = url.as_ref();
                self.request_for(platform, RequestPayload::from_urls([url]), "scrape_batch")
            })
            .collect::<Result<Vec<_>>>()?;

        let results = self.executor.execute_batch(requests).await;

        Ok(results
            .into_iter()
            .zip(urls)
            .map(|(result, url)| {
                let url: &str = url.as_ref();
                result.with_url(url).into_single_record()
            })
            .collect())
    }

    /// Scrape URLs of any registered platforms, one concurrent job per URL
    ///
    /// Each URL picks its platform from its host. A URL no platform claims
    /// becomes a failed result in its slot; the rest still run.
    ///
    /// # Returns
    /// One result per URL, in input order. Only invalid input is an `Err`.
    pub async fn scrape_each<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<CollectionResult>> {
        validate_url_list(urls)?;

        let mut slots: Vec<Option<CollectionResult>> = Vec::with_capacity(urls.len());
        let mut requests = Vec::new();
        for url in urls {
            let url: &str = url.as_ref();
            match self.registry.resolve_url(url) {
                Some(platform) => {
                    debug!("Resolved {} to platform {}", url, platform);
                    let platform = platform.to_string();
                    requests.push(self.request_for(&platform, RequestPayload::from_urls([url]), "scrape")?);
                    slots.push(None);
                }
                None => slots.push(Some(CollectionResult::failed(format!(
                    "no platform registered for URL: {url}"
                )))),
            }
        }

        let mut ran = self.executor.execute_batch(requests).await.into_iter();

        Ok(slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                let url: &str = url.as_ref();
                match slot {
                    Some(failed) => failed.with_url(url),
                    None => ran
                        .next()
                        .unwrap_or_else(|| CollectionResult::failed("missing batch result"))
                        .with_url(url)
                        .into_single_record(),
                }
            })
            .collect())
    }

    // =============================================================================
    // Blocking entry points
    // =============================================================================

    /// Blocking form of `scrape_url`
    ///
    /// Must not be called from inside an async runtime.
    pub fn scrape_url_blocking(&self, platform: &str, url: &str) -> Result<CollectionResult> {
        self.block_on(self.scrape_url(platform, url))
    }

    /// Blocking form of `scrape`
    pub fn scrape_blocking(&self, url: &str) -> Result<CollectionResult> {
        self.block_on(self.scrape(url))
    }

    /// Blocking form of `scrape_urls`
    pub fn scrape_urls_blocking<S: AsRef<str>>(
        &self,
        platform: &str,
        urls: &[S],
    ) -> Result<CollectionResult> {
        self.block_on(self.scrape_urls(platform, urls))
    }

    /// Blocking form of `scrape_batch`
    pub fn scrape_batch_blocking<S: AsRef<str>>(
        &self,
        platform: &str,
        urls: &[S],
    ) -> Result<Vec<CollectionResult>> {
        self.block_on(self.scrape_batch(platform, urls))
    }

    /// Blocking form of `scrape_each`
    pub fn scrape_each_blocking<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<CollectionResult>> {
        self.block_on(self.scrape_each(urls))
    }

    /// Drive `future` on a private current-thread runtime
    ///
    /// The engine is opened for the duration of the call, so no pooled
    /// connection outlives the runtime that created it.
    fn block_on<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to start runtime: {e}")))?;

        let _scope = match &self.engine {
            Some(engine) => Some(engine.enter()?),
            None => None,
        };

        runtime.block_on(future)
    }
}
