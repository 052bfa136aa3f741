//! Port interfaces for the token lifecycle
//!
//! These traits define the boundaries between the lifecycle logic and
//! the storage medium and network that back it.

use async_trait::async_trait;
use portal_auth_domain::{PortalAuthError, Result, TokenGrant, TokenRecord};

/// Durable per-tenant persistence for token records.
///
/// Implementations sanitize `member_id` before using it as a key and fail
/// with `InvalidMemberId` when nothing usable remains.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Replace the tenant's record atomically. Readers observe either the
    /// previous record or `record`, never a mix.
    async fn save(&self, member_id: &str, record: &TokenRecord) -> Result<()>;

    /// Load the tenant's record.
    ///
    /// Returns `Ok(None)` when nothing is stored and `MalformedRecord` when
    /// stored content is not a complete record.
    async fn load_strict(&self, member_id: &str) -> Result<Option<TokenRecord>>;

    /// Remove the tenant's record. Removing an absent record succeeds.
    async fn delete(&self, member_id: &str) -> Result<()>;

    /// Load the tenant's record, treating malformed content as absent.
    ///
    /// Storage failures are still returned.
    async fn load(&self, member_id: &str) -> Result<Option<TokenRecord>> {
        match self.load_strict(member_id).await {
            Err(PortalAuthError::MalformedRecord { member_id, reason }) => {
                tracing::error!(
                    member_id = %member_id,
                    reason = %reason,
                    "token_store.malformed_record"
                );
                Ok(None)
            }
            other => other,
        }
    }
}

/// The platform's OAuth token endpoint.
///
/// Adapters report failures as `ExchangeFailed` or `RefreshFailed`. The
/// lifecycle manager bounds every call with its own timeout.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Exchange an authorization code for a token pair.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    /// Mint a new access token from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}
