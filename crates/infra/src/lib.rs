//! # Portal Auth Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - A filesystem token store with atomic replacement
//! - An HTTP client for the platform's OAuth token endpoint
//! - Configuration loading from environment and files
//!
//! ## Architecture
//! - Implements traits defined in `portal-auth-core`
//! - Depends on `portal-auth-domain` and `portal-auth-core`
//! - Contains all "impure" code (filesystem and network I/O)

#![warn(missing_docs)]

pub mod config;
pub mod errors;
pub mod oauth;
pub mod storage;

// Re-export commonly used items
pub use errors::InfraError;
pub use oauth::HttpOAuthClient;
pub use storage::FileTokenStore;
