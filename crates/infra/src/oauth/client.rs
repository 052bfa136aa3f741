//! HTTP client for the platform's OAuth token endpoint
//!
//! Both grants are a `GET {token_url}` with query parameters:
//!
//! | grant                | extra parameter  |
//! |----------------------|------------------|
//! | `authorization_code` | `code`           |
//! | `refresh_token`      | `refresh_token`  |
//!
//! `client_id` and `client_secret` go with every call. Failures come back
//! as `{"error": "...", "error_description": "..."}`, sometimes with a 2xx
//! status, so the body is checked before the status.
//!
//! No retries: an authorization code is single use.

use std::time::Duration;

use async_trait::async_trait;
use portal_auth_core::OAuthClient;
use portal_auth_domain::types::serde_helpers::lenient_i64_opt;
use portal_auth_domain::{OAuthSettings, PortalAuthError, Result, TokenGrant};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;

use crate::errors::describe_http_error;

const USER_AGENT: &str = concat!("portal-auth/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Copy)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

impl Grant {
    fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    fn failure(self, message: String) -> PortalAuthError {
        match self {
            Self::AuthorizationCode => PortalAuthError::ExchangeFailed(message),
            Self::RefreshToken => PortalAuthError::RefreshFailed(message),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    expires_in: Option<i64>,
    #[serde(default)]
    member_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// reqwest-backed [`OAuthClient`].
#[derive(Clone)]
pub struct HttpOAuthClient {
    client: ReqwestClient,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpOAuthClient {
    /// Build a client from application credentials.
    ///
    /// # Errors
    /// Returns `Config` if the HTTP client cannot be constructed.
    pub fn new(settings: &OAuthSettings) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds.max(1)))
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(|err| PortalAuthError::Config(format!("http client: {err}")))?;

        Ok(Self {
            client,
            token_url: settings.token_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        })
    }

    /// Endpoint this client posts to.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn request(&self, grant: Grant, credential: &str) -> Result<TokenGrant> {
        let credential_param = match grant {
            Grant::AuthorizationCode => "code",
            Grant::RefreshToken => "refresh_token",
        };
        let query = [
            ("grant_type", grant.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            (credential_param, credential),
        ];

        tracing::debug!(grant = grant.as_str(), url = %self.token_url, "oauth.request");

        let response = self
            .client
            .get(&self.token_url)
            .query(&query)
            .send()
            .await
            .map_err(|err| grant.failure(describe_http_error(&err)))?;

        let status = response.status();
        let body = response.text().await.map_err(|err| grant.failure(describe_http_error(&err)))?;

        let parsed = parse_response(grant, status, &body);
        match &parsed {
            Ok(_) => tracing::debug!(grant = grant.as_str(), %status, "oauth.response"),
            Err(err) => tracing::warn!(
                grant = grant.as_str(),
                %status,
                error = %err,
                "oauth.request_failed"
            ),
        }
        parsed
    }
}

fn parse_response(grant: Grant, status: StatusCode, body: &str) -> Result<TokenGrant> {
    let response: Option<TokenResponse> = serde_json::from_str(body).ok();

    if let Some(TokenResponse { error: Some(error), error_description, .. }) = &response {
        let message = match error_description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => format!("{error}: {description}"),
            None => error.clone(),
        };
        return Err(grant.failure(message));
    }

    if !status.is_success() {
        return Err(grant.failure(format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        )));
    }

    let response = response.ok_or_else(|| grant.failure("token response is not JSON".into()))?;

    let access_token = response
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| grant.failure("token response has no access_token".into()))?;
    let expires_in = response
        .expires_in
        .ok_or_else(|| grant.failure("token response has no expires_in".into()))?;

    Ok(TokenGrant {
        access_token,
        refresh_token: response.refresh_token.filter(|token| !token.is_empty()),
        expires_in,
        member_id: response.member_id,
        domain: response.domain,
        scope: response.scope,
    })
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        self.request(Grant::AuthorizationCode, code).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.request(Grant::RefreshToken, refresh_token).await
    }
}
