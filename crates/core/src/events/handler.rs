//! Install/uninstall event translation
//!
//! Turns platform lifecycle notifications into manager operations and
//! reports a status the platform understands. No token validation happens
//! here.

use std::sync::Arc;

use portal_auth_domain::constants::{EVENT_APP_INSTALL, EVENT_APP_UNINSTALL};
use portal_auth_domain::{impl_keyword_conversions, PreIssuedAuth};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::lifecycle::{CallbackParams, TokenLifecycleManager};

/// Lifecycle events this handler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Application installed on a portal; may carry tokens.
    Install,
    /// Application removed; the tenant's record is deleted.
    Uninstall,
}

impl_keyword_conversions!(LifecycleEvent {
    Install => EVENT_APP_INSTALL,
    Uninstall => EVENT_APP_UNINSTALL,
});

/// An event notification as delivered by the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Event name, e.g. `ONAPPINSTALL`.
    pub event: String,
    /// Tenant the event concerns, when reported outside `auth`.
    #[serde(default)]
    pub member_id: Option<String>,
    /// Tokens delivered with an install notification.
    #[serde(default)]
    pub auth: Option<PreIssuedAuth>,
}

impl PlatformEvent {
    /// Event with no tenant or tokens attached.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self { event: event.into(), ..Self::default() }
    }

    /// Attach install tokens.
    #[must_use]
    pub fn with_auth(mut self, auth: PreIssuedAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Name the tenant outside `auth`.
    #[must_use]
    pub fn with_member_id(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    fn tenant(&self) -> Option<&str> {
        self.auth
            .as_ref()
            .map(|auth| auth.member_id.as_str())
            .or(self.member_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

/// Status signal returned to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EventStatus {
    /// The event was applied, or there was nothing to do.
    Success,
    /// The event could not be applied.
    Error {
        /// Reason reported back to the platform.
        message: String,
    },
    /// Not an event this handler acts on.
    Ignored,
}

impl EventStatus {
    /// Whether the platform should treat the event as handled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Routes platform events to the lifecycle manager.
pub struct LifecycleEventHandler {
    manager: Arc<TokenLifecycleManager>,
}

impl LifecycleEventHandler {
    /// Handler acting through `manager`.
    #[must_use]
    pub fn new(manager: Arc<TokenLifecycleManager>) -> Self {
        Self { manager }
    }

    /// Apply one event. Failures are reported in the returned status,
    /// never as an error.
    pub async fn handle(&self, event: PlatformEvent) -> EventStatus {
        match event.event.parse::<LifecycleEvent>() {
            Ok(LifecycleEvent::Install) => self.on_install(event.auth).await,
            Ok(LifecycleEvent::Uninstall) => match event.tenant() {
                Some(member_id) => self.on_uninstall(member_id).await,
                None => {
                    warn!(event = %event.event, "lifecycle_event.uninstall_without_tenant");
                    EventStatus::Success
                }
            },
            Err(_) => {
                info!(event = %event.event, "lifecycle_event.ignored");
                EventStatus::Ignored
            }
        }
    }

    /// Store the tokens delivered with an install event.
    pub async fn on_install(&self, auth: Option<PreIssuedAuth>) -> EventStatus {
        let Some(auth) = auth else {
            warn!("lifecycle_event.install_without_tokens");
            return EventStatus::Error { message: "install event carries no tokens".into() };
        };

        match self.manager.handle_callback(CallbackParams::pre_issued(auth)).await {
            Ok(record) => {
                info!(member_id = %record.member_id, "lifecycle_event.installed");
                EventStatus::Success
            }
            Err(err) => {
                warn!(error = %err, kind = err.label(), "lifecycle_event.install_failed");
                EventStatus::Error { message: err.to_string() }
            }
        }
    }

    /// Drop the tenant's record. Always reports success so the platform
    /// does not retry.
    pub async fn on_uninstall(&self, member_id: &str) -> EventStatus {
        match self.manager.delete_token(member_id).await {
            Ok(()) => info!(member_id, "lifecycle_event.uninstalled"),
            Err(err) => warn!(
                member_id,
                error = %err,
                kind = err.label(),
                "lifecycle_event.uninstall_failed"
            ),
        }
        EventStatus::Success
    }
}
