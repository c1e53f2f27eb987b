//! Configuration module
//!
//! Turns global CLI flags into engine and workflow configuration.

use anyhow::{Context, Result};
use dredge_client::{Engine, EngineConfig, RateLimit};
use dredge_runner::WorkflowConfig;
use std::sync::Arc;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API bearer token; only commands that call the API need it
    pub token: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
    /// Requests per second, 0 for unlimited
    pub rate_limit: u32,
}

impl Config {
    /// Build a closed engine from the global flags
    pub fn engine(&self) -> Result<Arc<Engine>> {
        let token = self
            .token
            .clone()
            .context("API token required: pass --token or set DREDGE_API_TOKEN")?;

        let config = EngineConfig::new(token)
            .with_base_url(self.base_url.clone())
            .with_request_timeout(self.request_timeout)
            .with_rate_limit((self.rate_limit > 0).then(|| RateLimit::per_second(self.rate_limit)));

        let engine = Engine::new(config).context("Invalid engine configuration")?;
        Ok(Arc::new(engine))
    }

    /// Workflow defaults from the environment
    pub fn workflow(&self) -> Result<WorkflowConfig> {
        WorkflowConfig::from_env().context("Invalid workflow configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> Config {
        Config {
            token: token.map(str::to_string),
            base_url: "http://127.0.0.1:9000".to_string(),
            request_timeout: Duration::from_secs(5),
            rate_limit: 0,
        }
    }

    #[test]
    fn test_engine_requires_token() {
        let err = config(None).engine().unwrap_err();
        assert!(err.to_string().contains("DREDGE_API_TOKEN"));
    }

    #[test]
    fn test_engine_from_flags() {
        let engine = config(Some("t")).engine().unwrap();
        assert!(engine.rate_limiter().is_none());
        assert_eq!(engine.config().base_url(), "http://127.0.0.1:9000");
        assert!(!engine.is_open());
    }
}
