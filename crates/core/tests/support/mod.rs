//! Shared test helpers for `portal-auth-core` integration tests.
//!
//! In-memory stand-ins for the storage and OAuth ports so lifecycle tests
//! can focus on behaviour instead of I/O.

#![allow(dead_code)]

pub mod oauth;
pub mod store;

use chrono::Utc;
use portal_auth_domain::{PortalAddress, TokenGrant, TokenRecord};

pub use oauth::MockOAuthClient;
pub use store::InMemoryTokenStore;

pub const CLIENT_ID: &str = "app.test";

/// A stored record for `member_id` that expires `expires_in` seconds from
/// now (negative for already expired).
pub fn record(member_id: &str, access: &str, refresh: &str, expires_in: i64) -> TokenRecord {
    let now = Utc::now().timestamp();
    let portal = PortalAddress::parse("https://acme.bitrix24.ru").unwrap();
    let mut record = TokenRecord::from_grant(
        member_id,
        &portal,
        CLIENT_ID,
        &TokenGrant::new(access, Some(refresh.to_string()), 3600),
        now - 7200,
    )
    .unwrap();
    record.expires_at = now + expires_in;
    record
}
