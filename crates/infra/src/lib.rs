//! # Tillpoint Infra
//!
//! Infrastructure adapters behind the `tillpoint-core` port traits:
//! - HTTP client with retry/backoff and the POS backend API client
//! - SQLite persistence for the pending-transaction slot
//! - Configuration loading from environment or file
//!
//! ## Architecture Principles
//! - Implements the traits defined in `tillpoint-core`
//! - All I/O lives here; core stays pure
//! - Errors cross the boundary as `tillpoint_domain::PosError`

pub mod api;
pub mod config;
pub mod http;
pub mod storage;

pub use api::{ApiError, ApiErrorCategory, PosApiClient, PosApiConfig, StaticTokenProvider};
pub use config::AppConfig;
pub use http::HttpClient;
pub use storage::PendingTransactionRepository;
