//! Transport engine
//!
//! Pooled, authenticated HTTP access to the dataset API. The engine must be
//! opened before use and closed to release its pooled connections; requests
//! made while it is closed fail with a configuration error. Every request
//! first takes a permit from the shared rate limiter.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{ClientError, Result};
use crate::rate_limit::RateLimiter;

/// Optional parts of a request
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// JSON body
    pub json: Option<Value>,
    /// Query string parameters
    pub query: Vec<(String, String)>,
    /// Extra headers, merged on top of the engine defaults
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Pooled HTTP engine shared by every job client in the process
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    limiter: Option<Arc<RateLimiter>>,
    session: RwLock<Session>,
}

/// Pooled client plus the holders keeping it alive
#[derive(Debug, Default)]
struct Session {
    client: Option<Client>,
    /// Live `EngineScope`s
    scopes: usize,
    /// Set by an explicit `open()`; only `close()` clears it
    pinned: bool,
}

impl Session {
    fn release_if_unused(&mut self) {
        if self.scopes == 0 && !self.pinned && self.client.take().is_some() {
            debug!("Engine closed");
        }
    }
}

/// Keeps an engine open for as long as it lives
///
/// Scopes nest and may be held by unrelated tasks at once. The engine
/// closes when the last scope is dropped, on every exit path including
/// cancellation, unless it was also opened explicitly with `open()`.
#[must_use = "the engine may close as soon as the scope is dropped"]
#[derive(Debug)]
pub struct EngineScope<'a> {
    engine: &'a Engine,
}

impl Drop for EngineScope<'_> {
    fn drop(&mut self) {
        let mut session = self.engine.session.write().expect("engine session lock poisoned");
        session.scopes = session.scopes.saturating_sub(1);
        session.release_if_unused();
    }
}

impl Engine {
    /// Create a closed engine
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let limiter = config.rate_limit.map(|limit| Arc::new(RateLimiter::new(limit)));

        Ok(Self {
            config,
            limiter,
            session: RwLock::new(Session::default()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.limiter.as_ref()
    }

    /// Open the engine until `close()` is called
    ///
    /// Opening an open engine reuses its pooled client.
    pub fn open(&self) -> Result<()> {
        let mut session = self.session.write().expect("engine session lock poisoned");
        self.ensure_client(&mut session)?;
        session.pinned = true;
        Ok(())
    }

    fn ensure_client(&self, session: &mut Session) -> Result<()> {
        if session.client.is_some() {
            return Ok(());
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.config.bearer_token))
            .map_err(|_| {
                ClientError::Configuration("bearer token contains invalid characters".into())
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(self.config.request_timeout)
            .user_agent(self.config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to create HTTP client: {e}")))?;

        debug!("Engine opened for {}", self.config.base_url());
        session.client = Some(client);
        Ok(())
    }

    /// Undo an explicit `open()`
    ///
    /// The pooled client is released once no scope is alive either.
    pub fn close(&self) {
        let mut session = self.session.write().expect("engine session lock poisoned");
        session.pinned = false;
        session.release_if_unused();
    }

    pub fn is_open(&self) -> bool {
        self.session
            .read()
            .expect("engine session lock poisoned")
            .client
            .is_some()
    }

    /// Open the engine for as long as the returned guard lives
    pub fn enter(&self) -> Result<EngineScope<'_>> {
        let mut session = self.session.write().expect("engine session lock poisoned");
        self.ensure_client(&mut session)?;
        session.scopes += 1;
        Ok(EngineScope { engine: self })
    }

    /// Resolve an endpoint against the base URL; absolute URLs pass through
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url(),
                endpoint.trim_start_matches('/')
            )
        }
    }

    fn client(&self) -> Result<Client> {
        self.session
            .read()
            .expect("engine session lock poisoned")
            .client
            .clone()
            .ok_or_else(|| {
                ClientError::Configuration(
                    "engine is not open; call open() or enter() before making requests".into(),
                )
            })
    }

    /// Issue one HTTP request
    ///
    /// 401/403 responses are turned into `ClientError::Authentication`; every
    /// other status is returned for the caller to interpret.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let client = self.client()?;
        let url = self.url_for(endpoint);

        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        debug!("{} {}", method, url);

        let mut builder = client.request(method, &url).headers(options.headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.json {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, self.config.request_timeout))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            let label = if status == StatusCode::UNAUTHORIZED {
                "Unauthorized"
            } else {
                "Forbidden"
            };
            warn!("{} rejected with {}", url, status);
            return Err(ClientError::Authentication(format!(
                "{label} ({}): {text}",
                status.as_u16()
            )));
        }

        Ok(response)
    }

    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, endpoint, options).await
    }

    pub async fn post(&self, endpoint: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::POST, endpoint, options).await
    }
}
