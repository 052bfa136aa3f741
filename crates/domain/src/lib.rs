//! # Portal Auth Domain
//!
//! Domain types for the per-tenant OAuth token lifecycle.
//!
//! This crate contains:
//! - Token records, grants and pre-issued install payloads
//! - Tenant identifier sanitization
//! - Configuration structures
//! - The error taxonomy and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other portal-auth crates
//! - Only external dependencies allowed
//! - Pure data structures and validation, no I/O

#![warn(missing_docs)]

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
