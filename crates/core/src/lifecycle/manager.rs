//! Token lifecycle manager
//!
//! Decides, per request, whether a tenant's token must be exchanged,
//! reused, refreshed or rejected, and serializes every read-modify-write
//! of one tenant's record behind a [`TenantLocks`] entry.
//!
//! Locking rules:
//! - `refresh_if_needed` holds the tenant lock across load, refresh and
//!   save, so two racing refreshes perform one network call.
//! - `handle_callback` exchanges the code outside the lock and only takes
//!   it for the save. The callback carries fresh credentials and must
//!   replace whatever is stored.
//! - `delete_token` takes the lock so an in-flight refresh cannot bring a
//!   deleted record back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use portal_auth_domain::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REFRESH_THRESHOLD_SECS};
use portal_auth_domain::{
    AppConfig, MemberId, MemberIdPolicy, PortalAddress, PortalAuthError, PreIssuedAuth, Result,
    TokenGrant, TokenRecord,
};
use tracing::{debug, info, warn};

use super::locks::TenantLocks;
use crate::ports::{OAuthClient, TokenStore};

/// Tunables for [`TokenLifecycleManager`].
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Application id written into every record.
    pub client_id: String,
    /// Upper bound on one exchange or refresh call.
    pub call_timeout: Duration,
    /// Tokens expiring within this many seconds count as stale.
    pub refresh_threshold_seconds: i64,
    /// How tenant ids with disallowed characters are handled.
    pub member_id_policy: MemberIdPolicy,
}

impl LifecycleOptions {
    /// Defaults for `client_id`.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            call_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            refresh_threshold_seconds: DEFAULT_REFRESH_THRESHOLD_SECS,
            member_id_policy: MemberIdPolicy::default(),
        }
    }

    /// Options taken from loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            client_id: config.oauth.client_id.clone(),
            call_timeout: Duration::from_secs(config.oauth.timeout_seconds),
            refresh_threshold_seconds: config.lifecycle.refresh_threshold_seconds,
            member_id_policy: config.storage.member_id_policy,
        }
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Override the staleness threshold.
    #[must_use]
    pub fn with_refresh_threshold(mut self, seconds: i64) -> Self {
        self.refresh_threshold_seconds = seconds;
        self
    }

    /// Override the tenant id policy.
    #[must_use]
    pub fn with_member_id_policy(mut self, policy: MemberIdPolicy) -> Self {
        self.member_id_policy = policy;
        self
    }
}

/// Inputs of an authorization callback.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    /// Authorization code to exchange.
    pub code: Option<String>,
    /// Opaque value echoed by the platform. Logged, never interpreted.
    pub state: Option<String>,
    /// Portal URL or bare domain the request came from.
    pub portal_url: Option<String>,
    /// Tenant id reported by the request itself. Validated before the
    /// exchange; the exchange response's id takes precedence.
    pub member_id: Option<String>,
    /// Tokens delivered directly; no exchange happens.
    pub pre_issued: Option<PreIssuedAuth>,
}

impl CallbackParams {
    /// Callback carrying an authorization code.
    #[must_use]
    pub fn with_code(code: impl Into<String>, portal_url: impl Into<String>) -> Self {
        Self { code: Some(code.into()), portal_url: Some(portal_url.into()), ..Self::default() }
    }

    /// Install event carrying tokens directly.
    #[must_use]
    pub fn pre_issued(auth: PreIssuedAuth) -> Self {
        Self { pre_issued: Some(auth), ..Self::default() }
    }

    /// Attach the echoed `state` value.
    #[must_use]
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Attach the tenant id the request reported.
    #[must_use]
    pub fn member_id(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }
}

#[derive(Clone, Copy)]
enum Call {
    Exchange,
    Refresh,
}

impl Call {
    fn name(self) -> &'static str {
        match self {
            Self::Exchange => "code exchange",
            Self::Refresh => "token refresh",
        }
    }

    fn failure(self, message: String) -> PortalAuthError {
        match self {
            Self::Exchange => PortalAuthError::ExchangeFailed(message),
            Self::Refresh => PortalAuthError::RefreshFailed(message),
        }
    }

    fn normalize(self, err: PortalAuthError) -> PortalAuthError {
        match (self, err) {
            (Self::Exchange, err @ PortalAuthError::ExchangeFailed(_))
            | (Self::Refresh, err @ PortalAuthError::RefreshFailed(_)) => err,
            (call, other) => call.failure(other.to_string()),
        }
    }
}

/// The per-tenant token lifecycle state machine
pub struct TokenLifecycleManager {
    store: Arc<dyn TokenStore>,
    oauth: Arc<dyn OAuthClient>,
    locks: TenantLocks,
    options: LifecycleOptions,
}

impl TokenLifecycleManager {
    /// Manager over the given store and OAuth endpoint.
    #[must_use]
    pub fn new(
        store: Arc<dyn TokenStore>,
        oauth: Arc<dyn OAuthClient>,
        options: LifecycleOptions,
    ) -> Self {
        Self { store, oauth, locks: TenantLocks::new(), options }
    }

    /// Options the manager was built with.
    #[must_use]
    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Whether a complete record is stored for the tenant. Expiry is not
    /// considered.
    ///
    /// # Errors
    /// Storage failures and unusable identifiers are returned; malformed
    /// records count as not authorized.
    pub async fn is_authorized(&self, member_id: &str) -> Result<bool> {
        Ok(self.get_token(member_id).await?.is_some())
    }

    /// Current record without side effects.
    pub async fn get_token(&self, member_id: &str) -> Result<Option<TokenRecord>> {
        let member = self.member_id(member_id)?;
        self.store.load(member.as_str()).await
    }

    /// Store credentials from an authorization callback.
    ///
    /// Pre-issued tokens are stored as-is. Otherwise the code is exchanged
    /// and the result is combined with the portal address. The tenant id is
    /// taken from the pre-issued payload, then the exchange response, then
    /// the request. A request tenant id is validated before the exchange;
    /// when neither the request nor the response names a tenant the code
    /// is spent and nothing is stored.
    ///
    /// # Errors
    /// - `InvalidRequest` without code or pre-issued tokens, or when no
    ///   tenant id or portal address can be resolved
    /// - `InvalidMemberId` when a tenant id is unusable; a bad request id
    ///   fails before the code is exchanged
    /// - `ExchangeFailed` when the exchange fails or times out; nothing is
    ///   written
    /// - `StorageFailure` when the record cannot be saved
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<TokenRecord> {
        let now = Utc::now().timestamp();

        if let Some(auth) = params.pre_issued.as_ref() {
            let member = self.member_id(&auth.member_id)?;
            let record =
                TokenRecord::from_pre_issued(auth, member.as_str(), &self.options.client_id, now)
                    .map_err(|err| match err {
                        PortalAuthError::MalformedRecord { reason, .. } => {
                            PortalAuthError::InvalidRequest(format!("pre-issued tokens: {reason}"))
                        }
                        other => other,
                    })?;
            self.persist(&member, &record, params.state.as_deref(), "pre_issued").await?;
            return Ok(record);
        }

        let code = params
            .code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                PortalAuthError::InvalidRequest(
                    "callback carries neither an authorization code nor pre-issued tokens".into(),
                )
            })?;

        let requested_portal = params
            .portal_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(PortalAddress::parse)
            .transpose()?;

        // Checked before the code is spent.
        let requested_member = params
            .member_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| self.member_id(id))
            .transpose()?;

        let grant = self.bounded(Call::Exchange, self.oauth.exchange_code(code)).await?;

        let portal = match (requested_portal, grant.domain.as_deref()) {
            (Some(portal), _) => portal,
            (None, Some(domain)) => PortalAddress::parse(domain)?,
            (None, None) => {
                return Err(PortalAuthError::InvalidRequest(
                    "portal address missing from callback and exchange response".into(),
                ))
            }
        };

        let member = match (grant.member_id.as_deref(), requested_member) {
            (Some(raw), _) => self.member_id(raw)?,
            (None, Some(member)) => member,
            (None, None) => {
                return Err(PortalAuthError::InvalidRequest(
                    "tenant id missing from callback and exchange response".into(),
                ))
            }
        };

        let record = TokenRecord::from_grant(
            member.as_str(),
            &portal,
            self.options.client_id.as_str(),
            &grant,
            Utc::now().timestamp(),
        )
        .map_err(|err| Call::Exchange.failure(format!("incomplete token response: {err}")))?;

        self.persist(&member, &record, params.state.as_deref(), "code_exchange").await?;
        Ok(record)
    }

    /// Return the tenant's record, refreshing it first when stale.
    ///
    /// A fresh record is returned without any network call. On refresh
    /// failure the stored record is left untouched.
    ///
    /// # Errors
    /// `NotInstalled`, `RefreshFailed` or `StorageFailure`.
    pub async fn refresh_if_needed(&self, member_id: &str) -> Result<TokenRecord> {
        let member = self.member_id(member_id)?;
        let _guard = self.locks.acquire(member.as_str()).await;

        let current = self
            .store
            .load(member.as_str())
            .await?
            .ok_or_else(|| PortalAuthError::NotInstalled(member.to_string()))?;

        let threshold = self.options.refresh_threshold_seconds;
        if !current.is_expired(Utc::now().timestamp(), threshold) {
            debug!(
                member_id = %member,
                expires_at = current.expires_at,
                "lifecycle.token_fresh"
            );
            return Ok(current);
        }

        let grant = self
            .bounded(Call::Refresh, self.oauth.refresh(&current.refresh_token))
            .await
            .map_err(|err| {
                warn!(member_id = %member, error = %err, "lifecycle.refresh_failed");
                err
            })?;

        let next = current
            .refreshed(&grant, Utc::now().timestamp())
            .map_err(|err| Call::Refresh.failure(format!("incomplete token response: {err}")))?;

        self.store.save(member.as_str(), &next).await?;

        info!(
            member_id = %member,
            expires_at = next.expires_at,
            rotated = grant.refresh_token.is_some(),
            "lifecycle.token_refreshed"
        );
        Ok(next)
    }

    /// Fresh access token for the tenant, refreshing when needed.
    pub async fn access_token(&self, member_id: &str) -> Result<String> {
        Ok(self.refresh_if_needed(member_id).await?.access_token)
    }

    /// Remove the tenant's record. Absent records are not an error.
    pub async fn delete_token(&self, member_id: &str) -> Result<()> {
        let member = self.member_id(member_id)?;
        let _guard = self.locks.acquire(member.as_str()).await;
        self.store.delete(member.as_str()).await?;
        info!(member_id = %member, "lifecycle.token_deleted");
        Ok(())
    }

    fn member_id(&self, raw: &str) -> Result<MemberId> {
        MemberId::parse(raw, self.options.member_id_policy)
    }

    async fn persist(
        &self,
        member: &MemberId,
        record: &TokenRecord,
        state: Option<&str>,
        source: &'static str,
    ) -> Result<()> {
        let _guard = self.locks.acquire(member.as_str()).await;
        self.store.save(member.as_str(), record).await?;
        info!(
            member_id = %member,
            domain = %record.domain,
            source,
            state = state.unwrap_or_default(),
            expires_at = record.expires_at,
            "lifecycle.token_stored"
        );
        Ok(())
    }

    async fn bounded<F>(&self, call: Call, fut: F) -> Result<TokenGrant>
    where
        F: Future<Output = Result<TokenGrant>>,
    {
        match tokio::time::timeout(self.options.call_timeout, fut).await {
            Ok(result) => result.map_err(|err| call.normalize(err)),
            Err(_) => Err(call.failure(format!(
                "{} timed out after {:?}",
                call.name(),
                self.options.call_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_failures_keep_their_own_variant() {
        let kept = Call::Refresh.normalize(PortalAuthError::RefreshFailed("invalid_grant".into()));
        assert_eq!(kept, PortalAuthError::RefreshFailed("invalid_grant".into()));

        let wrapped = Call::Exchange.normalize(PortalAuthError::Internal("boom".into()));
        assert!(matches!(wrapped, PortalAuthError::ExchangeFailed(msg) if msg.contains("boom")));
    }

    #[test]
    fn options_follow_config() {
        let mut config = AppConfig::default();
        config.oauth.client_id = "app.7".into();
        config.oauth.timeout_seconds = 5;
        config.lifecycle.refresh_threshold_seconds = 120;
        config.storage.member_id_policy = MemberIdPolicy::Reject;

        let options = LifecycleOptions::from_config(&config);
        assert_eq!(options.client_id, "app.7");
        assert_eq!(options.call_timeout, Duration::from_secs(5));
        assert_eq!(options.refresh_threshold_seconds, 120);
        assert_eq!(options.member_id_policy, MemberIdPolicy::Reject);
    }
}
