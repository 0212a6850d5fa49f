//! POS backend API adapter
//!
//! Implements the `OrderGateway` and `ConnectionTokenProvider` ports over
//! the backend's HTTP API.

mod auth;
mod client;
mod errors;

pub use auth::{AccessTokenProvider, StaticTokenProvider};
pub use client::{PosApiClient, PosApiConfig};
pub use errors::{ApiError, ApiErrorCategory};
