//! Workflow configuration
//!
//! Defaults for every workflow invocation: polling cadence and deadline,
//! pricing, the retry policy wrapped around each job primitive, and the
//! fan-out concurrency cap.

use dredge_client::RetryPolicy;
use dredge_core::ResultFormat;
use std::time::Duration;

/// Default delay between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default polling deadline
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Default price of one collected record, in USD
pub const DEFAULT_COST_PER_RECORD: f64 = 0.001;

/// Poll deadline for platforms that answer quickly
pub const POLL_TIMEOUT_FAST: Duration = Duration::from_secs(120);

/// Poll deadline for typical profile-style collections
pub const POLL_TIMEOUT_STANDARD: Duration = Duration::from_secs(180);

/// Poll deadline for slow product and social collections
pub const POLL_TIMEOUT_EXTENDED: Duration = Duration::from_secs(240);

/// Workflow configuration
///
/// Per-request overrides on `WorkflowRequest` take precedence over these.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Delay between status checks; zero polls back to back
    pub poll_interval: Duration,

    /// Maximum wall-clock time spent polling one snapshot
    pub poll_timeout: Duration,

    /// Price of one record, used to derive `CollectionResult::cost`
    pub cost_per_record: f64,

    /// Ask the service to keep per-record errors in the snapshot
    pub include_errors: bool,

    /// Snapshot download format
    pub format: ResultFormat,

    /// Retry policy applied to each trigger, status and fetch call
    pub retry: RetryPolicy,

    /// Maximum workflows in flight during a fan-out, `None` for unbounded
    pub max_concurrency: Option<usize>,
}

impl WorkflowConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            cost_per_record: DEFAULT_COST_PER_RECORD,
            include_errors: true,
            format: ResultFormat::Json,
            retry: RetryPolicy::default(),
            max_concurrency: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DREDGE_POLL_INTERVAL (optional, seconds, default: 10)
    /// - DREDGE_POLL_TIMEOUT (optional, seconds, default: 600)
    /// - DREDGE_COST_PER_RECORD (optional, USD, default: 0.001)
    /// - DREDGE_MAX_RETRIES (optional, default: 3)
    /// - DREDGE_MAX_CONCURRENCY (optional, 0 for unbounded, default: unbounded)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Some(interval) = env_parse::<u64>("DREDGE_POLL_INTERVAL")? {
            config.poll_interval = Duration::from_secs(interval);
        }

        if let Some(timeout) = env_parse::<u64>("DREDGE_POLL_TIMEOUT")? {
            config.poll_timeout = Duration::from_secs(timeout);
        }

        if let Some(cost) = env_parse::<f64>("DREDGE_COST_PER_RECORD")? {
            config.cost_per_record = cost;
        }

        if let Some(retries) = env_parse::<u32>("DREDGE_MAX_RETRIES")? {
            config.retry = config.retry.with_max_retries(retries);
        }

        if let Some(limit) = env_parse::<usize>("DREDGE_MAX_CONCURRENCY")? {
            config.max_concurrency = (limit > 0).then_some(limit);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_cost_per_record(mut self, cost: f64) -> Self {
        self.cost_per_record = cost;
        self
    }

    pub fn with_include_errors(mut self, include_errors: bool) -> Self {
        self.include_errors = include_errors;
        self
    }

    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_timeout.is_zero() {
            anyhow::bail!("poll_timeout must be greater than 0");
        }

        if !self.cost_per_record.is_finite() || self.cost_per_record < 0.0 {
            anyhow::bail!("cost_per_record must be a non-negative number");
        }

        if self.retry.backoff_factor < 1.0 {
            anyhow::bail!("backoff_factor must be at least 1.0");
        }

        if self.max_concurrency == Some(0) {
            anyhow::bail!("max_concurrency must be greater than 0 when set");
        }

        Ok(())
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.poll_timeout, Duration::from_secs(600));
        assert_eq!(config.cost_per_record, 0.001);
        assert!(config.include_errors);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.max_concurrency.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = WorkflowConfig::default();

        config.poll_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.poll_timeout = Duration::from_secs(5);

        config.cost_per_record = -0.5;
        assert!(config.validate().is_err());
        config.cost_per_record = 0.0;
        assert!(config.validate().is_ok());

        config.max_concurrency = Some(0);
        assert!(config.validate().is_err());
        config.max_concurrency = Some(4);

        // zero interval is allowed
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = WorkflowConfig::new()
            .with_poll_interval(Duration::from_secs(1))
            .with_poll_timeout(POLL_TIMEOUT_FAST)
            .with_cost_per_record(0.005)
            .with_include_errors(false)
            .with_format(ResultFormat::Raw)
            .with_max_concurrency(Some(2));

        assert_eq!(config.poll_timeout, Duration::from_secs(120));
        assert_eq!(config.cost_per_record, 0.005);
        assert!(!config.include_errors);
        assert_eq!(config.format, ResultFormat::Raw);
        assert_eq!(config.max_concurrency, Some(2));
    }
}
