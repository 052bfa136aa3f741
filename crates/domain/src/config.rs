//! Configuration management

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_TOKEN_DIR, DEFAULT_TOKEN_URL,
};
use crate::errors::{PortalAuthError, Result};
use crate::types::MemberIdPolicy;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where and how records are stored.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Platform OAuth application credentials.
    pub oauth: OAuthSettings,
    /// Token refresh behaviour.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// Reject configurations that cannot talk to the platform.
    ///
    /// # Errors
    /// Returns `PortalAuthError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.oauth.client_id.trim().is_empty() {
            return Err(PortalAuthError::Config("oauth.client_id is empty".into()));
        }
        if self.oauth.client_secret.trim().is_empty() {
            return Err(PortalAuthError::Config("oauth.client_secret is empty".into()));
        }
        if self.oauth.timeout_seconds == 0 {
            return Err(PortalAuthError::Config("oauth.timeout_seconds must be positive".into()));
        }
        if self.lifecycle.refresh_threshold_seconds < 0 {
            return Err(PortalAuthError::Config(
                "lifecycle.refresh_threshold_seconds must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Token storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one record file per tenant.
    #[serde(default = "default_token_dir")]
    pub token_dir: PathBuf,
    /// How tenant ids with disallowed characters are handled.
    #[serde(default)]
    pub member_id_policy: MemberIdPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { token_dir: default_token_dir(), member_id_policy: MemberIdPolicy::default() }
    }
}

/// Platform OAuth application credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct OAuthSettings {
    /// Application id issued by the platform.
    pub client_id: String,
    /// Application secret. Never serialized.
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// OAuth token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Upper bound on a single exchange or refresh call.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl OAuthSettings {
    /// Credentials with the default endpoint and timeout.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: default_token_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Token freshness policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Tokens expiring within this many seconds count as stale.
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_seconds: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { refresh_threshold_seconds: default_refresh_threshold() }
    }
}

fn default_token_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_DIR)
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_refresh_threshold() -> i64 {
    DEFAULT_REFRESH_THRESHOLD_SECS
}
