//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! workspace.

// Platform OAuth
/// Platform OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.bitrix.info/oauth/token/";
/// Path appended to the portal origin to form the REST endpoint.
pub const REST_PATH_SUFFIX: &str = "/rest/";
/// Scheme assumed for bare portal hosts.
pub const DEFAULT_URL_SCHEME: &str = "https";

// Network bounds
/// Default bound on one OAuth call, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Lifecycle
/// Seconds before expiry at which a token counts as stale.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 0;

// Storage
/// Default record directory.
pub const DEFAULT_TOKEN_DIR: &str = "tokens";
/// Extension of record files.
pub const TOKEN_FILE_EXTENSION: &str = "json";

// Platform lifecycle event names
/// Event sent when the application is installed.
pub const EVENT_APP_INSTALL: &str = "ONAPPINSTALL";
/// Event sent when the application is removed.
pub const EVENT_APP_UNINSTALL: &str = "ONAPPUNINSTALL";
