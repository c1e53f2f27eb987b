//! Error types for the dredge client

use dredge_core::ValidationError;
use thiserror::Error;

use crate::ssl;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// HTTP status codes that are worth retrying by default
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Errors that can occur when talking to the dataset API
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed input, rejected before any network call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 401/403 from the API
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// DNS, connection or proxy failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request-level or poll-level deadline exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// TLS certificate verification failed; the message carries remediation steps
    #[error("{0}")]
    Ssl(String),

    /// API returned an unexpected status code
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response text or a description of the failure
        message: String,
    },

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Missing configuration or engine used outside its open scope
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A snapshot being waited on ended in a failure status
    #[error("Job {snapshot_id} failed with status: {status}")]
    JobFailed { snapshot_id: String, status: String },
}

/// Fieldless discriminant of `ClientError`, used to select retryable kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Network,
    Timeout,
    Ssl,
    Api,
    Parse,
    Configuration,
    JobFailed,
}

impl ErrorKind {
    /// Kinds retried by `retry_with_backoff` when the caller does not choose
    pub const DEFAULT_RETRYABLE: [ErrorKind; 3] =
        [ErrorKind::Network, ErrorKind::Timeout, ErrorKind::Api];

    /// Failures of the connection itself rather than of the API
    pub const TRANSPORT: [ErrorKind; 2] = [ErrorKind::Network, ErrorKind::Timeout];
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Ssl(_) => ErrorKind::Ssl,
            Self::Api { .. } => ErrorKind::Api,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::JobFailed { .. } => ErrorKind::JobFailed,
        }
    }

    /// HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if (400..500).contains(status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }

    /// Whether this is an API error with one of the given statuses
    pub fn has_status_in(&self, statuses: &[u16]) -> bool {
        self.status().is_some_and(|status| statuses.contains(&status))
    }

    /// Network/timeout failures and API errors with a retryable status
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    /// Errors that must escape a workflow instead of becoming a failed result
    ///
    /// These are programmer or account problems that retrying or re-polling
    /// cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::Configuration(_) | Self::Validation(_)
        )
    }

    /// Classify a transport failure from reqwest
    ///
    /// Certificate problems are checked first since reqwest reports them as
    /// connect errors.
    pub fn from_transport(err: reqwest::Error, request_timeout: std::time::Duration) -> Self {
        if ssl::is_certificate_error(&err) {
            return Self::Ssl(ssl::remediation_message(&err));
        }

        if err.is_timeout() {
            return Self::Timeout(format!(
                "Request timeout after {} seconds",
                request_timeout.as_secs_f64()
            ));
        }

        if err.is_decode() {
            return Self::Parse(err.to_string());
        }

        Self::Network(ssl::error_chain(&err))
    }
}
