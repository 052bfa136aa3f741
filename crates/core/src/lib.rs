//! # Portal Auth Core
//!
//! Token lifecycle logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for token storage and the platform OAuth endpoint
//! - The per-tenant token lifecycle state machine
//! - Translation of platform install/uninstall events
//!
//! ## Architecture Principles
//! - Only depends on `portal-auth-domain`
//! - No filesystem, HTTP or platform code
//! - All external dependencies via traits

#![warn(missing_docs)]

pub mod events;
pub mod lifecycle;
pub mod ports;

pub use events::{EventStatus, LifecycleEvent, LifecycleEventHandler, PlatformEvent};
pub use lifecycle::{CallbackParams, LifecycleOptions, TenantGuard, TenantLocks, TokenLifecycleManager};
pub use ports::{OAuthClient, TokenStore};
