//! Portal addressing
//!
//! Derives the tenant's domain and REST base URL from whatever form the
//! platform handed us: a full portal URL or a bare host.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{DEFAULT_URL_SCHEME, REST_PATH_SUFFIX};
use crate::errors::{PortalAuthError, Result};

/// Network address of one tenant portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalAddress {
    /// Host, plus `:port` when a non-default port is present.
    pub domain: String,
    /// Base URL for REST calls, always ending in `/rest/`.
    pub client_endpoint: String,
}

impl PortalAddress {
    /// Parse a portal URL (`https://acme.bitrix24.ru`) or bare domain
    /// (`acme.bitrix24.ru`). A missing scheme defaults to https.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the input is blank or has no host.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PortalAuthError::InvalidRequest("portal address is empty".into()));
        }

        let candidate =
            if raw.contains("://") { raw.to_string() } else { format!("{DEFAULT_URL_SCHEME}://{raw}") };

        let url = Url::parse(&candidate).map_err(|e| {
            PortalAuthError::InvalidRequest(format!("invalid portal address '{raw}': {e}"))
        })?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| PortalAuthError::InvalidRequest(format!("portal address '{raw}' has no host")))?
            .to_ascii_lowercase();

        let domain = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };

        let client_endpoint = format!("{}://{domain}{REST_PATH_SUFFIX}", url.scheme());

        Ok(Self { domain, client_endpoint })
    }
}
