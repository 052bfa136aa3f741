//! Tracing subscriber setup and command logging helpers.

use std::time::Duration;

use portal_auth_domain::{impl_keyword_conversions, PortalAuthError, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Selects the log output format.
pub const ENV_LOG_FORMAT: &str = "PORTAL_AUTH_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl_keyword_conversions!(LogFormat {
    Text => "text",
    Json => "json",
});

impl LogFormat {
    /// Format requested through the environment. Unknown values fall back
    /// to text.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(ENV_LOG_FORMAT)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

/// Install the global subscriber. Output goes to stderr so stdout stays
/// free for command results.
///
/// # Errors
/// Returns `Config` for an unparsable `RUST_LOG` and `Internal` if a
/// subscriber is already installed.
pub fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .map_err(|e| PortalAuthError::Config(format!("invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed
        .map_err(|e| PortalAuthError::Internal(format!("failed to install tracing subscriber: {e}")))
}

/// Log the outcome of a CLI command with structured fields.
///
/// `command` must be a stable identifier; tenant ids go in their own field.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&PortalAuthError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(command, duration_ms, "command.succeeded"),
        Some(err) => warn!(
            command,
            duration_ms,
            kind = err.label(),
            severity = ?err.severity(),
            error = %err,
            "command.failed"
        ),
    }
}
