//! Tenant identifiers
//!
//! A `member_id` is used as a storage key, so it is reduced to
//! `[A-Za-z0-9_-]` before it ever touches a path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{PortalAuthError, Result};
use crate::impl_keyword_conversions;

/// What to do with characters outside the allowed identifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberIdPolicy {
    /// Drop disallowed characters (historical behaviour).
    #[default]
    Strip,
    /// Fail with `InvalidMemberId` when any disallowed character is present.
    Reject,
}

impl_keyword_conversions!(MemberIdPolicy {
    Strip => "strip",
    Reject => "reject",
});

/// Sanitized tenant identifier, safe to use as a storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(String);

impl MemberId {
    /// Sanitize `raw` according to `policy`.
    ///
    /// # Errors
    /// Returns `InvalidMemberId` if the result is empty, or if `policy` is
    /// `Reject` and `raw` contains a disallowed character.
    pub fn parse(raw: &str, policy: MemberIdPolicy) -> Result<Self> {
        let sanitized = sanitize_member_id(raw);

        if policy == MemberIdPolicy::Reject && sanitized.len() != raw.len() {
            return Err(PortalAuthError::InvalidMemberId(format!(
                "'{}' contains characters outside [A-Za-z0-9_-]",
                raw.escape_default()
            )));
        }

        if sanitized.is_empty() {
            return Err(PortalAuthError::InvalidMemberId(format!(
                "'{}' is empty after sanitization",
                raw.escape_default()
            )));
        }

        Ok(Self(sanitized))
    }

    /// Sanitized identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the sanitized string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip every character outside `[A-Za-z0-9_-]`.
#[must_use]
pub fn sanitize_member_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').collect()
}
