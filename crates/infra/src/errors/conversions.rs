//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use portal_auth_domain::PortalAuthError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use tempfile::PersistError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PortalAuthError);

impl From<InfraError> for PortalAuthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PortalAuthError> for InfraError {
    fn from(value: PortalAuthError) -> Self {
        InfraError(value)
    }
}

trait IntoPortalAuthError {
    fn into_portal_auth(self) -> PortalAuthError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → PortalAuthError */
/* -------------------------------------------------------------------------- */

impl IntoPortalAuthError for IoError {
    fn into_portal_auth(self) -> PortalAuthError {
        let message = match self.kind() {
            ErrorKind::PermissionDenied => format!("permission denied: {self}"),
            ErrorKind::NotFound => format!("storage path missing: {self}"),
            _ => self.to_string(),
        };
        PortalAuthError::StorageFailure(message)
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_portal_auth())
    }
}

impl From<PersistError> for InfraError {
    fn from(value: PersistError) -> Self {
        InfraError(PortalAuthError::StorageFailure(format!(
            "atomic replace failed: {}",
            value.error
        )))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → PortalAuthError */
/* -------------------------------------------------------------------------- */

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        // Parse failures of stored records are mapped at the call site where
        // the tenant is known; this covers encoding.
        InfraError(PortalAuthError::Internal(format!("json encoding failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → PortalAuthError */
/* -------------------------------------------------------------------------- */

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        InfraError(PortalAuthError::Internal(format!("blocking storage task failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → message */
/* -------------------------------------------------------------------------- */

/// Human-readable cause of an HTTP failure.
///
/// Whether it becomes `ExchangeFailed` or `RefreshFailed` depends on the
/// call, so this stops at the message.
#[must_use]
pub fn describe_http_error(err: &HttpError) -> String {
    if err.is_timeout() {
        return "HTTP request timed out".into();
    }

    if err.is_connect() {
        return "HTTP connection failure".into();
    }

    if let Some(status) = err.status() {
        return format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        );
    }

    if err.is_decode() {
        return format!("unreadable token response: {err}");
    }

    err.to_string()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn io_errors_are_storage_failures() {
        let err = IoError::new(ErrorKind::PermissionDenied, "tokens/m1.json");
        let mapped: PortalAuthError = InfraError::from(err).into();
        match mapped {
            PortalAuthError::StorageFailure(msg) => assert!(msg.contains("permission denied")),
            other => panic!("expected storage failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_error_is_internal() {
        let handle = tokio::spawn(async { panic!("boom") });
        let err = handle.await.unwrap_err();
        let mapped: PortalAuthError = InfraError::from(err).into();
        assert!(matches!(mapped, PortalAuthError::Internal(_)));
    }

    #[tokio::test]
    async fn http_status_is_described() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        assert_eq!(describe_http_error(&error), "HTTP 401 Unauthorized");
    }
}
