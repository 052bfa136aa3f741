//! Keyed async mutual exclusion, one lock per tenant
//!
//! Entries are created on first use and pruned when the last holder or
//! waiter lets go, so the map only holds tenants with work in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Per-tenant lock map. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct TenantLocks {
    inner: Arc<LockMap>,
}

impl TenantLocks {
    /// Empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Holders of different keys never wait on each other.
    pub async fn acquire(&self, key: &str) -> TenantGuard {
        let mutex = {
            let entry =
                self.inner.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };

        let guard = mutex.lock_owned().await;
        TenantGuard { key: key.to_string(), guard: Some(guard), locks: Arc::clone(&self.inner) }
    }

    /// Number of tenants currently holding or waiting for a lock.
    #[must_use]
    pub fn active(&self) -> usize {
        self.inner.len()
    }
}

/// Exclusive access to one tenant, released on drop.
pub struct TenantGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl TenantGuard {
    /// Tenant this guard holds.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or waits.
        self.locks.remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
