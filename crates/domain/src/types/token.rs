//! Token records and the payloads they are built from
//!
//! A [`TokenRecord`] is the persisted unit of tenant authorization state.
//! It is only ever built from a [`TokenGrant`] (code exchange or refresh
//! response) or a [`PreIssuedAuth`] (install event), so `expires_at` always
//! comes from the platform.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::portal::PortalAddress;
use super::serde_helpers::lenient_i64_opt;
use crate::errors::{PortalAuthError, Result};

/// Persisted authorization state of one tenant.
///
/// Serialized with camelCase field names and epoch-second timestamps. The
/// snake_case names written by the legacy installer are accepted on read.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Sanitized tenant id.
    #[serde(alias = "member_id")]
    pub member_id: String,

    /// Portal host, without scheme.
    pub domain: String,

    /// Current access token.
    #[serde(alias = "access_token")]
    pub access_token: String,

    /// Refresh token; rotated on every refresh.
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,

    /// Epoch seconds after which `access_token` is stale.
    #[serde(alias = "expires_at")]
    pub expires_at: i64,

    /// Application id the tokens were issued to.
    #[serde(alias = "client_id")]
    pub client_id: String,

    /// REST endpoint of the portal.
    #[serde(alias = "client_endpoint")]
    pub client_endpoint: String,

    /// Epoch seconds of record creation. Informational only.
    #[serde(alias = "install_time")]
    pub install_time: i64,

    /// Granted permission scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenRecord {
    /// Build a fresh record from a code-exchange response.
    ///
    /// `member_id` and `portal` are resolved by the caller; the grant must
    /// carry a refresh token.
    ///
    /// # Errors
    /// Returns `MalformedRecord` if the grant lacks usable tokens.
    pub fn from_grant(
        member_id: impl Into<String>,
        portal: &PortalAddress,
        client_id: impl Into<String>,
        grant: &TokenGrant,
        now: i64,
    ) -> Result<Self> {
        let record = Self {
            member_id: member_id.into(),
            domain: portal.domain.clone(),
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone().unwrap_or_default(),
            expires_at: now.saturating_add(grant.expires_in.max(0)),
            client_id: client_id.into(),
            client_endpoint: portal.client_endpoint.clone(),
            install_time: now,
            scope: grant.scope.clone(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Build a record from tokens delivered with an install event.
    ///
    /// A payload without a lifetime is stamped as already expired so the
    /// first use refreshes it.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the domain is unusable and
    /// `MalformedRecord` if either token is empty.
    pub fn from_pre_issued(
        auth: &PreIssuedAuth,
        member_id: impl Into<String>,
        default_client_id: &str,
        now: i64,
    ) -> Result<Self> {
        let portal = PortalAddress::parse(&auth.domain)?;
        let expires_at = match auth.expires_in {
            Some(secs) => now.saturating_add(secs.max(0)),
            None => now,
        };

        let record = Self {
            member_id: member_id.into(),
            domain: portal.domain,
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            expires_at,
            client_id: auth
                .client_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| default_client_id.to_string()),
            client_endpoint: portal.client_endpoint,
            install_time: now,
            scope: auth.scope.clone(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Apply a refresh response, keeping tenant identity untouched.
    ///
    /// A response without a refresh token means the old one stays valid.
    ///
    /// # Errors
    /// Returns `MalformedRecord` if the response carries an empty access
    /// token.
    pub fn refreshed(&self, grant: &TokenGrant, now: i64) -> Result<Self> {
        let mut next = self.clone();
        next.access_token = grant.access_token.clone();
        if let Some(rotated) = grant.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            next.refresh_token = rotated.clone();
        }
        next.expires_at = now.saturating_add(grant.expires_in.max(0));
        if grant.scope.is_some() {
            next.scope = grant.scope.clone();
        }
        next.validate()?;
        Ok(next)
    }

    /// Structural validation applied before every write and after every read.
    ///
    /// # Errors
    /// Returns `MalformedRecord` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("memberId", &self.member_id),
            ("domain", &self.domain),
            ("accessToken", &self.access_token),
            ("refreshToken", &self.refresh_token),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field);

        match missing {
            Some(field) => Err(PortalAuthError::MalformedRecord {
                member_id: self.member_id.clone(),
                reason: format!("{field} is empty"),
            }),
            None => Ok(()),
        }
    }

    /// Whether the access token is stale at `now`, treating tokens that
    /// expire within `threshold_seconds` as already stale.
    #[must_use]
    pub fn is_expired(&self, now: i64, threshold_seconds: i64) -> bool {
        now.saturating_add(threshold_seconds.max(0)) >= self.expires_at
    }

    /// Seconds until expiry at `now`; negative once expired.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: i64) -> i64 {
        self.expires_at.saturating_sub(now)
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("member_id", &self.member_id)
            .field("domain", &self.domain)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("client_id", &self.client_id)
            .field("client_endpoint", &self.client_endpoint)
            .field("install_time", &self.install_time)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Tokens returned by the platform's token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// New access token.
    pub access_token: String,

    /// `None` when the endpoint did not rotate the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// Tenant the tokens belong to, when the endpoint reports it.
    #[serde(default)]
    pub member_id: Option<String>,

    /// Portal host, when the endpoint reports it.
    #[serde(default)]
    pub domain: Option<String>,

    /// Granted permission scope.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Grant with no tenant, domain or scope attached.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in,
            member_id: None,
            domain: None,
            scope: None,
        }
    }

    /// Attach the reported tenant id.
    #[must_use]
    pub fn with_member_id(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    /// Attach the reported portal host.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Attach the granted scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("member_id", &self.member_id)
            .field("domain", &self.domain)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Tokens delivered directly by the platform with an install event.
///
/// Accepts the installer's form names (`AUTH_ID`, `REFRESH_ID`,
/// `AUTH_EXPIRES`, `DOMAIN`), the event's `auth[...]` names and camelCase.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreIssuedAuth {
    /// Tenant id, before sanitization.
    #[serde(alias = "memberId")]
    pub member_id: String,

    /// Portal host or URL.
    #[serde(alias = "DOMAIN")]
    pub domain: String,

    /// Access token issued at install.
    #[serde(alias = "AUTH_ID", alias = "accessToken")]
    pub access_token: String,

    /// Refresh token issued at install.
    #[serde(alias = "REFRESH_ID", alias = "refreshToken")]
    pub refresh_token: String,

    /// Access token lifetime in seconds. The platform default applies when absent.
    #[serde(
        default,
        alias = "AUTH_EXPIRES",
        alias = "expiresIn",
        deserialize_with = "lenient_i64_opt"
    )]
    pub expires_in: Option<i64>,

    /// Application id, when sent.
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,

    /// Granted permission scope.
    #[serde(default)]
    pub scope: Option<String>,
}

impl PreIssuedAuth {
    /// Payload with the required fields only.
    #[must_use]
    pub fn new(
        member_id: impl Into<String>,
        domain: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            domain: domain.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_in,
            client_id: None,
            scope: None,
        }
    }
}

impl fmt::Debug for PreIssuedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreIssuedAuth")
            .field("member_id", &self.member_id)
            .field("domain", &self.domain)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn portal() -> PortalAddress {
        PortalAddress::parse("https://acme.bitrix24.ru").unwrap()
    }

    fn record() -> TokenRecord {
        let grant = TokenGrant::new("AT1", Some("RT1".into()), 3600);
        TokenRecord::from_grant("m1", &portal(), "app.123", &grant, NOW).unwrap()
    }

    #[test]
    fn from_grant_derives_endpoint_and_expiry() {
        let record = record();
        assert_eq!(record.domain, "acme.bitrix24.ru");
        assert_eq!(record.client_endpoint, "https://acme.bitrix24.ru/rest/");
        assert_eq!(record.expires_at, NOW + 3600);
        assert_eq!(record.install_time, NOW);
        assert_eq!(record.client_id, "app.123");
    }

    #[test]
    fn from_grant_without_refresh_token_is_malformed() {
        let grant = TokenGrant::new("AT1", None, 3600);
        let err = TokenRecord::from_grant("m1", &portal(), "app", &grant, NOW).unwrap_err();
        assert!(matches!(err, PortalAuthError::MalformedRecord { .. }));
    }

    #[test]
    fn refresh_keeps_identity_and_old_refresh_token_when_not_rotated() {
        let original = record();
        let next = original.refreshed(&TokenGrant::new("AT2", None, 1800), NOW + 4000).unwrap();

        assert_eq!(next.member_id, original.member_id);
        assert_eq!(next.domain, original.domain);
        assert_eq!(next.install_time, original.install_time);
        assert_eq!(next.access_token, "AT2");
        assert_eq!(next.refresh_token, "RT1");
        assert_eq!(next.expires_at, NOW + 4000 + 1800);
    }

    #[test]
    fn refresh_rotates_refresh_token() {
        let next = record().refreshed(&TokenGrant::new("AT2", Some("RT2".into()), 3600), NOW).unwrap();
        assert_eq!(next.refresh_token, "RT2");
    }

    #[test]
    fn expiry_threshold() {
        let record = record();
        assert!(!record.is_expired(NOW, 0));
        assert!(record.is_expired(NOW + 3600, 0));
        assert!(record.is_expired(NOW + 3500, 300));
        assert_eq!(record.seconds_until_expiry(NOW + 600), 3000);
    }

    #[test]
    fn pre_issued_without_lifetime_is_already_stale() {
        let auth = PreIssuedAuth::new("m1", "acme.bitrix24.ru", "AT0", "RT0", None);
        let record = TokenRecord::from_pre_issued(&auth, "m1", "app", NOW).unwrap();
        assert!(record.is_expired(NOW, 0));
        assert_eq!(record.client_endpoint, "https://acme.bitrix24.ru/rest/");
    }

    #[test]
    fn pre_issued_accepts_installer_field_names() {
        let body = r#"{
            "member_id": "m1",
            "DOMAIN": "acme.bitrix24.ru",
            "AUTH_ID": "AT0",
            "REFRESH_ID": "RT0",
            "AUTH_EXPIRES": "3600"
        }"#;
        let auth: PreIssuedAuth = serde_json::from_str(body).unwrap();
        assert_eq!(auth.access_token, "AT0");
        assert_eq!(auth.refresh_token, "RT0");
        assert_eq!(auth.expires_in, Some(3600));
    }

    #[test]
    fn serializes_camel_case_and_reads_legacy_snake_case() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["memberId"], "m1");
        assert_eq!(json["expiresAt"], NOW + 3600);
        assert!(json.get("scope").is_none());

        let legacy = r#"{
            "member_id": "m1",
            "domain": "acme.bitrix24.ru",
            "access_token": "AT1",
            "refresh_token": "RT1",
            "expires_at": 1700003600,
            "install_time": 1700000000,
            "client_id": "app.123",
            "client_endpoint": "https://acme.bitrix24.ru/rest/"
        }"#;
        let parsed: TokenRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn truncated_record_fails_to_parse() {
        assert!(serde_json::from_str::<TokenRecord>(r#"{"memberId":"m2"}"#).is_err());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", record());
        assert!(!rendered.contains("AT1"));
        assert!(!rendered.contains("RT1"));
    }
}
