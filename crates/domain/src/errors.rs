//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Tillpoint
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PosError {
    /// Setup problems: missing client secret, missing token provider, bad
    /// base URL. Fatal to the current attempt, never retried silently.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Card reader errors (discovery, connect, collect, process). The
    /// session manager returns to a safe state so the operator can retry.
    #[error("Reader error: {0}")]
    Reader(String),

    #[error("Payment error: {0}")]
    Payment(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation in progress: {0}")]
    Busy(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Tillpoint operations
pub type Result<T> = std::result::Result<T, PosError>;

impl PosError {
    /// Whether this error indicates a setup problem rather than a
    /// transient, operator-retryable failure. Configuration errors are
    /// logged distinctly for diagnosis.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_flagged_as_configuration() {
        assert!(PosError::Config("no client secret".into()).is_configuration());
        assert!(!PosError::Network("connection reset".into()).is_configuration());
        assert!(!PosError::Reader("declined".into()).is_configuration());
    }

    #[test]
    fn errors_serialize_with_type_tag() {
        let err = PosError::Reader("no readers found".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Reader");
        assert_eq!(json["message"], "no readers found");
    }
}
