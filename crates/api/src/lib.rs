//! # Portal Auth Application
//!
//! Composition root for the token lifecycle services.
//!
//! This crate contains:
//! - [`AppContext`], which builds the object graph from configuration
//! - The request dispatcher used by the front controller
//! - Logging setup for the `portal-auth` binary

#![warn(missing_docs)]

pub mod context;
pub mod controller;
pub mod utils;

pub use context::AppContext;
pub use controller::{dispatch, EventAuth, Outcome, RequestContext};
