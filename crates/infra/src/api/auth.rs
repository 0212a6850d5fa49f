//! API authentication
//!
//! The backend authenticates the register with a bearer token issued at
//! device enrolment. The provider trait keeps token retrieval injectable
//! so tests and future refresh flows slot in without touching the client.

use async_trait::async_trait;

use super::errors::ApiError;

/// Trait for providing access tokens
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid access token. Implementations handle refresh if the
    /// token scheme requires it.
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// Fixed-token provider for registers enrolled with a long-lived key
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        if self.token.is_empty() {
            return Err(ApiError::Config("api token is empty".into()));
        }
        Ok(self.token.clone())
    }
}
