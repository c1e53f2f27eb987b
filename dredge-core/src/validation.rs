//! Pre-flight input validation
//!
//! Every check here runs before any network activity and is never retried.

use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Malformed caller input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Check that `url` is an absolute http(s) URL with a host
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::new("URL must be a non-empty string"));
    }

    let parsed =
        Url::parse(url).map_err(|_| ValidationError::new(format!("Invalid URL format: {url}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::new(format!(
            "URL must use http or https scheme: {url}"
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::new(format!("Invalid URL format: {url}")));
    }

    Ok(())
}

/// Check a non-empty list of URLs
pub fn validate_url_list<S: AsRef<str>>(urls: &[S]) -> Result<(), ValidationError> {
    if urls.is_empty() {
        return Err(ValidationError::new("URL list cannot be empty"));
    }

    urls.iter().try_for_each(|url| validate_url(url.as_ref()))
}

/// Dataset ids are opaque but always `[A-Za-z0-9_-]+`
pub fn validate_dataset_id(dataset_id: &str) -> Result<(), ValidationError> {
    if dataset_id.is_empty() {
        return Err(ValidationError::new("dataset_id must be a non-empty string"));
    }

    if !dataset_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::new(format!(
            "Invalid dataset_id format: {dataset_id}"
        )));
    }

    Ok(())
}

/// Reject a zero poll timeout
///
/// Any poll interval is valid; zero means "poll back to back".
pub fn validate_poll_timeout(poll_timeout: Duration) -> Result<(), ValidationError> {
    if poll_timeout.is_zero() {
        return Err(ValidationError::new("poll_timeout must be greater than 0"));
    }
    Ok(())
}
