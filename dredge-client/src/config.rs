//! Engine configuration
//!
//! Defines the connection settings for the transport engine: credentials,
//! API base URL, request timeout and the process-wide rate limit.

use std::time::Duration;

use crate::error::{ClientError, Result};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.brightdata.com";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request ceiling, per second
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// Static client identifier sent with every request
pub const USER_AGENT: &str = concat!("dredge/", env!("CARGO_PKG_VERSION"));

/// Request-rate ceiling: at most `max_requests` per `period`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub period: Duration,
}

impl RateLimit {
    pub fn per_second(max_requests: u32) -> Self {
        Self {
            max_requests,
            period: Duration::from_secs(1),
        }
    }
}

/// Transport engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bearer token sent in the Authorization header
    pub bearer_token: String,

    /// API base URL; relative endpoints are joined onto it
    pub base_url: String,

    /// Maximum time for one HTTP request
    pub request_timeout: Duration,

    /// Shared request-rate ceiling, `None` to disable
    pub rate_limit: Option<RateLimit>,

    /// Value of the User-Agent header
    pub user_agent: String,
}

impl EngineConfig {
    /// Creates a new configuration with defaults
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limit: Some(RateLimit::per_second(DEFAULT_RATE_LIMIT)),
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DREDGE_API_TOKEN (required)
    /// - DREDGE_BASE_URL (optional, default: https://api.brightdata.com)
    /// - DREDGE_REQUEST_TIMEOUT (optional, seconds, default: 30)
    /// - DREDGE_RATE_LIMIT (optional, requests per second, 0 disables, default: 10)
    pub fn from_env() -> Result<Self> {
        let bearer_token = std::env::var("DREDGE_API_TOKEN").map_err(|_| {
            ClientError::Configuration("DREDGE_API_TOKEN environment variable not set".into())
        })?;

        let mut config = Self::new(bearer_token);

        if let Ok(base_url) = std::env::var("DREDGE_BASE_URL") {
            config.base_url = base_url;
        }

        if let Some(timeout) = std::env::var("DREDGE_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(timeout);
        }

        if let Some(limit) = std::env::var("DREDGE_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            config.rate_limit = (limit > 0).then(|| RateLimit::per_second(limit));
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimit>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bearer_token.trim().is_empty() {
            return Err(ClientError::Configuration(
                "bearer token cannot be empty".into(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::Configuration(
                "base_url must start with http:// or https://".into(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ClientError::Configuration(
                "request_timeout must be greater than 0".into(),
            ));
        }

        if let Some(limit) = self.rate_limit {
            if limit.max_requests == 0 || limit.period.is_zero() {
                return Err(ClientError::Configuration(
                    "rate limit must allow at least one request per non-zero period".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::new("token");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.rate_limit, Some(RateLimit::per_second(10)));
        assert!(config.user_agent.starts_with("dredge/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::new("token");

        config.bearer_token = "  ".to_string();
        assert!(config.validate().is_err());
        config.bearer_token = "token".to_string();

        config.base_url = "api.brightdata.com".to_string();
        assert!(config.validate().is_err());
        config.base_url = "http://127.0.0.1:9000/".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");

        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.request_timeout = Duration::from_secs(1);

        config.rate_limit = Some(RateLimit::per_second(0));
        assert!(config.validate().is_err());
        config.rate_limit = None;
        assert!(config.validate().is_ok());
    }
}
