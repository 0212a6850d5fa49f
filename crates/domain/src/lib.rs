//! # Tillpoint Domain
//!
//! Business domain types for the point-of-sale payment orchestrator.
//!
//! This crate contains:
//! - Domain data types (cart lines, orders, terminal session state)
//! - Domain error types and Result definitions
//! - Domain constants (retry bounds, storage keys)
//!
//! ## Architecture
//! - No dependencies on other tillpoint crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
