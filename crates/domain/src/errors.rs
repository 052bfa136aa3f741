//! Error types used throughout the token lifecycle

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for portal-auth
///
/// Storage and network failures are returned to the caller as-is; nothing in
/// the core retries them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PortalAuthError {
    /// Callback carried neither an authorization code nor pre-issued tokens,
    /// or the tenant could not be identified.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Tenant identifier is empty after sanitization or was rejected.
    #[error("Invalid member id: {0}")]
    InvalidMemberId(String),

    /// Authorization code exchange failed or timed out.
    #[error("Code exchange failed: {0}")]
    ExchangeFailed(String),

    /// Token refresh failed or timed out.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// No token record is stored for the tenant.
    #[error("Application is not installed for member {0}")]
    NotInstalled(String),

    /// Token storage medium is unreadable or unwritable.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Stored record exists but failed structural validation.
    #[error("Malformed token record for member {member_id}: {reason}")]
    MalformedRecord {
        /// Tenant whose record is unusable.
        member_id: String,
        /// What failed to validate.
        reason: String,
    },

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invariant broken inside the service.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for portal-auth operations
pub type Result<T> = std::result::Result<T, PortalAuthError>;

impl PortalAuthError {
    /// Stable label suitable for structured log fields.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidMemberId(_) => "invalid_member_id",
            Self::ExchangeFailed(_) => "exchange_failed",
            Self::RefreshFailed(_) => "refresh_failed",
            Self::NotInstalled(_) => "not_installed",
            Self::StorageFailure(_) => "storage_failure",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Severity used to pick the log level at the boundary.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotInstalled(_) => ErrorSeverity::Info,
            Self::InvalidRequest(_) | Self::InvalidMemberId(_) => ErrorSeverity::Warning,
            Self::ExchangeFailed(_) | Self::RefreshFailed(_) | Self::Config(_) => {
                ErrorSeverity::Error
            }
            Self::StorageFailure(_) | Self::MalformedRecord { .. } | Self::Internal(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// Critical errors risk locking a tenant out and need investigation.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Whether the caller should send the tenant through authorization again.
    #[must_use]
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::NotInstalled(_) | Self::RefreshFailed(_))
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Expected condition, informational only
    Info,
    /// Bad input or degraded but operational
    Warning,
    /// Failure requiring attention
    Error,
    /// Tenant data at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
