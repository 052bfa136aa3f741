use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portal_auth_core::TokenStore;
use portal_auth_domain::{sanitize_member_id, PortalAuthError, Result, TokenRecord};

/// Stored value: a parsed record, or raw text that fails validation.
#[derive(Clone)]
enum Slot {
    Record(TokenRecord),
    Corrupt(String),
}

/// In-memory `TokenStore` keyed by sanitized member id.
#[derive(Default, Clone)]
pub struct InMemoryTokenStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    saves: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: TokenRecord) -> Self {
        let key = sanitize_member_id(&record.member_id);
        self.slots.lock().unwrap().insert(key, Slot::Record(record));
        self
    }

    /// Seed content that exists but is not a complete record.
    pub fn with_corrupt(self, member_id: &str, reason: &str) -> Self {
        self.slots
            .lock()
            .unwrap()
            .insert(sanitize_member_id(member_id), Slot::Corrupt(reason.to_string()));
        self
    }

    /// Make every subsequent save and delete fail with `StorageFailure`.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get(&self, member_id: &str) -> Option<TokenRecord> {
        match self.slots.lock().unwrap().get(&sanitize_member_id(member_id)) {
            Some(Slot::Record(record)) => Some(record.clone()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }

    fn key(member_id: &str) -> Result<String> {
        let key = sanitize_member_id(member_id);
        if key.is_empty() {
            return Err(PortalAuthError::InvalidMemberId(member_id.to_string()));
        }
        Ok(key)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortalAuthError::StorageFailure("read-only medium".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, member_id: &str, record: &TokenRecord) -> Result<()> {
        let key = Self::key(member_id)?;
        self.check_writable()?;
        record.validate()?;
        self.slots.lock().unwrap().insert(key, Slot::Record(record.clone()));
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_strict(&self, member_id: &str) -> Result<Option<TokenRecord>> {
        let key = Self::key(member_id)?;
        match self.slots.lock().unwrap().get(&key) {
            None => Ok(None),
            Some(Slot::Record(record)) => Ok(Some(record.clone())),
            Some(Slot::Corrupt(reason)) => Err(PortalAuthError::MalformedRecord {
                member_id: key.clone(),
                reason: reason.clone(),
            }),
        }
    }

    async fn delete(&self, member_id: &str) -> Result<()> {
        let key = Self::key(member_id)?;
        self.check_writable()?;
        self.slots.lock().unwrap().remove(&key);
        Ok(())
    }
}
