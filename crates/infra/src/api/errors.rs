//! API-specific error types
//!
//! Provides error classification for backend operations with retry
//! metadata, and the mapping into the domain error type.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tillpoint_domain::PosError;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403) - retry after token refresh
    Authentication,
    /// Rate limiting errors (429) - retry with backoff
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except auth) - non-retryable
    Client,
    /// Network/connection errors - retryable
    Network,
    /// Configuration errors - non-retryable
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// Classify a non-success HTTP status into an API error.
    pub fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        let detail = if body.is_empty() { status.to_string() } else { body };
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Self::Auth(format!("{url}: {detail}"))
            }
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimit(format!("{url}: {detail}")),
            s if s.is_server_error() => Self::Server(format!("{url}: {detail}")),
            _ => Self::Client(format!("{url}: {detail}")),
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Check if this error should be retried
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::Authentication
                | ApiErrorCategory::RateLimit
                | ApiErrorCategory::Server
                | ApiErrorCategory::Network
        )
    }
}

/// Map API errors into the domain error the core layer understands.
/// Transient categories land on `Network` so the coordinator's retry
/// policy treats them as retryable.
impl From<ApiError> for PosError {
    fn from(err: ApiError) -> Self {
        match err.category() {
            ApiErrorCategory::Authentication => PosError::Auth(err.to_string()),
            ApiErrorCategory::Config => PosError::Config(err.to_string()),
            ApiErrorCategory::Client => PosError::InvalidInput(err.to_string()),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network => {
                PosError::Network(err.to_string())
            }
        }
    }
}

impl From<PosError> for ApiError {
    fn from(err: PosError) -> Self {
        match err {
            PosError::Network(msg) => Self::Network(msg),
            PosError::Auth(msg) => Self::Auth(msg),
            PosError::Config(msg) => Self::Config(msg),
            other => Self::Client(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_classify_by_category() {
        let auth = ApiError::from_status(StatusCode::UNAUTHORIZED, "/orders", String::new());
        assert_eq!(auth.category(), ApiErrorCategory::Authentication);

        let rate = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "/orders", String::new());
        assert_eq!(rate.category(), ApiErrorCategory::RateLimit);

        let server = ApiError::from_status(StatusCode::BAD_GATEWAY, "/orders", String::new());
        assert_eq!(server.category(), ApiErrorCategory::Server);

        let client = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            "/orders",
            "missing items".into(),
        );
        assert_eq!(client.category(), ApiErrorCategory::Client);
    }

    #[test]
    fn retryability_follows_category() {
        assert!(ApiError::Auth("test".to_string()).should_retry());
        assert!(ApiError::RateLimit("test".to_string()).should_retry());
        assert!(ApiError::Server("test".to_string()).should_retry());
        assert!(ApiError::Network("test".to_string()).should_retry());
        assert!(!ApiError::Client("test".to_string()).should_retry());
        assert!(!ApiError::Config("test".to_string()).should_retry());
    }

    #[test]
    fn transient_errors_map_to_retryable_domain_errors() {
        let err: PosError = ApiError::Server("boom".into()).into();
        assert!(matches!(err, PosError::Network(_)));

        let err: PosError = ApiError::Client("bad request".into()).into();
        assert!(matches!(err, PosError::InvalidInput(_)));

        let err: PosError = ApiError::Auth("expired".into()).into();
        assert!(matches!(err, PosError::Auth(_)));
    }
}
