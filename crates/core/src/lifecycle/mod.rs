//! Per-tenant token lifecycle

pub mod locks;
pub mod manager;

pub use locks::{TenantGuard, TenantLocks};
pub use manager::{CallbackParams, LifecycleOptions, TokenLifecycleManager};
