//! Request dispatch
//!
//! Translates the parameters the platform sends to the application's entry
//! point into lifecycle operations. Routing order:
//!
//! 1. `event` present: install/uninstall notification
//! 2. `code` present: authorization callback
//! 3. POST carrying `DOMAIN`, `AUTH_ID`, `REFRESH_ID` and `member_id`:
//!    installer form with pre-issued tokens
//! 4. otherwise: authorization status from the store
//!
//! Rendering is left to the caller. Request parameters never stand in for
//! a stored record.

use portal_auth_core::{CallbackParams, EventStatus, PlatformEvent};
use portal_auth_domain::types::serde_helpers::lenient_i64_opt;
use portal_auth_domain::{PreIssuedAuth, TokenRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::AppContext;

/// Parameters of one inbound request, under the platform's own names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// HTTP method. Only the installer route looks at it.
    #[serde(default, alias = "REQUEST_METHOD")]
    pub method: Option<String>,

    /// Lifecycle event name, e.g. `ONAPPINSTALL`.
    #[serde(default, alias = "EVENT")]
    pub event: Option<String>,

    /// Authorization code from the OAuth redirect.
    #[serde(default)]
    pub code: Option<String>,

    /// Opaque value echoed by the platform.
    #[serde(default)]
    pub state: Option<String>,

    /// Tenant id.
    #[serde(default, alias = "memberId")]
    pub member_id: Option<String>,

    /// Portal host or URL.
    #[serde(default, alias = "DOMAIN")]
    pub domain: Option<String>,

    /// `auth` object of event notifications.
    #[serde(default)]
    pub auth: Option<EventAuth>,

    /// Installer form access token.
    #[serde(default, alias = "AUTH_ID")]
    pub access_token: Option<String>,

    /// Installer form refresh token.
    #[serde(default, alias = "REFRESH_ID")]
    pub refresh_token: Option<String>,

    /// Installer form access token lifetime in seconds.
    #[serde(default, alias = "AUTH_EXPIRES", deserialize_with = "lenient_i64_opt")]
    pub expires_in: Option<i64>,

    /// Application id, when the platform sends one.
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
}

impl RequestContext {
    fn is_post(&self) -> bool {
        self.method.as_deref().is_some_and(|m| m.eq_ignore_ascii_case("POST"))
    }

    /// Installer-form tokens, when every required field is present.
    fn form_tokens(&self) -> Option<PreIssuedAuth> {
        let member_id = present(self.member_id.as_deref())?;
        let domain = present(self.domain.as_deref())?;
        let access_token = present(self.access_token.as_deref())?;
        let refresh_token = present(self.refresh_token.as_deref())?;

        let mut auth =
            PreIssuedAuth::new(member_id, domain, access_token, refresh_token, self.expires_in);
        auth.client_id = self.client_id.clone();
        Some(auth)
    }

    fn into_event(mut self) -> PlatformEvent {
        let nested = self.auth.take().unwrap_or_default();
        let member_id = present(self.member_id.as_deref())
            .or(present(nested.member_id.as_deref()))
            .map(str::to_string);
        let auth = nested.into_pre_issued().or_else(|| self.form_tokens());
        PlatformEvent {
            event: self.event.unwrap_or_default(),
            member_id,
            auth,
        }
    }
}

/// `auth` object of an event notification.
///
/// Install notifications carry tokens; uninstall notifications carry only
/// the tenant, its domain and an application token. Every field is
/// optional so both parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventAuth {
    /// Tenant id.
    #[serde(default, alias = "memberId")]
    pub member_id: Option<String>,

    /// Portal host.
    #[serde(default, alias = "DOMAIN")]
    pub domain: Option<String>,

    /// Access token. Install notifications only.
    #[serde(default, alias = "AUTH_ID", alias = "accessToken")]
    pub access_token: Option<String>,

    /// Refresh token. Install notifications only.
    #[serde(default, alias = "REFRESH_ID", alias = "refreshToken")]
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(
        default,
        alias = "AUTH_EXPIRES",
        alias = "expiresIn",
        deserialize_with = "lenient_i64_opt"
    )]
    pub expires_in: Option<i64>,

    /// Application id.
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,

    /// Granted permission scope.
    #[serde(default)]
    pub scope: Option<String>,
}

impl EventAuth {
    /// Pre-issued tokens, when the tenant, domain and both tokens are present.
    #[must_use]
    pub fn into_pre_issued(self) -> Option<PreIssuedAuth> {
        let member_id = present(self.member_id.as_deref())?;
        let domain = present(self.domain.as_deref())?;
        let access_token = present(self.access_token.as_deref())?;
        let refresh_token = present(self.refresh_token.as_deref())?;

        let mut auth =
            PreIssuedAuth::new(member_id, domain, access_token, refresh_token, self.expires_in);
        auth.client_id = self.client_id;
        auth.scope = self.scope;
        Some(auth)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Result of dispatching one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Status to report back to the platform for a lifecycle event.
    Event(EventStatus),
    /// The tenant holds a valid record.
    Authorized(TokenRecord),
    /// An authorization attempt was made and failed.
    AuthorizationFailed(String),
    /// No record exists for the tenant, or no tenant was named.
    NotAuthorized,
}

impl Outcome {
    /// Whether the outcome carries a valid record.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// Stable label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Authorized(_) => "authorized",
            Self::AuthorizationFailed(_) => "authorization_failed",
            Self::NotAuthorized => "not_authorized",
        }
    }

    /// JSON view of the outcome. Token values are left out.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Event(status) => serde_json::json!({ "outcome": self.label(), "event": status }),
            Self::Authorized(record) => {
                serde_json::json!({ "outcome": self.label(), "tenant": record_summary(record) })
            }
            Self::AuthorizationFailed(message) => {
                serde_json::json!({ "outcome": self.label(), "message": message })
            }
            Self::NotAuthorized => serde_json::json!({ "outcome": self.label() }),
        }
    }
}

/// Public fields of a record, without credentials.
#[must_use]
pub fn record_summary(record: &TokenRecord) -> serde_json::Value {
    serde_json::json!({
        "memberId": record.member_id,
        "domain": record.domain,
        "clientId": record.client_id,
        "clientEndpoint": record.client_endpoint,
        "expiresAt": record.expires_at,
        "installTime": record.install_time,
        "scope": record.scope,
    })
}

/// Route one request to the lifecycle services.
pub async fn dispatch(ctx: &AppContext, request: RequestContext) -> Outcome {
    if present(request.event.as_deref()).is_some() {
        let event = request.into_event();
        debug!(event = %event.event, "dispatch.event");
        return Outcome::Event(ctx.events.handle(event).await);
    }

    if let Some(code) = present(request.code.as_deref()) {
        let mut params = CallbackParams {
            code: Some(code.to_string()),
            state: request.state.clone(),
            portal_url: present(request.domain.as_deref()).map(str::to_string),
            ..CallbackParams::default()
        };
        if let Some(member_id) = present(request.member_id.as_deref()) {
            params = params.member_id(member_id);
        }
        debug!(state = ?params.state, "dispatch.callback");
        return authorize(ctx, params).await;
    }

    if request.is_post() {
        if let Some(auth) = request.form_tokens() {
            debug!(member_id = %auth.member_id, "dispatch.installer");
            return authorize(ctx, CallbackParams::pre_issued(auth)).await;
        }
    }

    let Some(member_id) = present(request.member_id.as_deref()) else {
        return Outcome::NotAuthorized;
    };

    match ctx.manager.get_token(member_id).await {
        Ok(Some(record)) => Outcome::Authorized(record),
        Ok(None) => Outcome::NotAuthorized,
        Err(err) => {
            warn!(member_id, kind = err.label(), error = %err, "dispatch.status_failed");
            Outcome::AuthorizationFailed(err.to_string())
        }
    }
}

async fn authorize(ctx: &AppContext, params: CallbackParams) -> Outcome {
    match ctx.manager.handle_callback(params).await {
        Ok(record) => {
            info!(member_id = %record.member_id, domain = %record.domain, "dispatch.authorized");
            Outcome::Authorized(record)
        }
        Err(err) => {
            warn!(kind = err.label(), error = %err, "dispatch.authorization_failed");
            Outcome::AuthorizationFailed(err.to_string())
        }
    }
}
