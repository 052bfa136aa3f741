//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the credentials are missing there, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `PORTAL_AUTH_CLIENT_ID`: application id (required)
//! - `PORTAL_AUTH_CLIENT_SECRET`: application secret (required)
//! - `PORTAL_AUTH_TOKEN_DIR`: token directory
//! - `PORTAL_AUTH_TOKEN_URL`: OAuth token endpoint
//! - `PORTAL_AUTH_HTTP_TIMEOUT`: exchange/refresh timeout in seconds
//! - `PORTAL_AUTH_MEMBER_ID_POLICY`: `strip` or `reject`
//! - `PORTAL_AUTH_REFRESH_THRESHOLD`: seconds before expiry that count as
//!   stale
//!
//! ## File Locations
//! The loader probes, in order, `portal-auth.{json,toml}` and
//! `config.{json,toml}` in the working directory, its two parents and the
//! executable's directory.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use portal_auth_domain::{
    AppConfig, LifecycleConfig, MemberIdPolicy, OAuthSettings, PortalAuthError, Result,
    StorageConfig,
};

/// Application id.
pub const ENV_CLIENT_ID: &str = "PORTAL_AUTH_CLIENT_ID";
/// Application secret.
pub const ENV_CLIENT_SECRET: &str = "PORTAL_AUTH_CLIENT_SECRET";
/// Record directory.
pub const ENV_TOKEN_DIR: &str = "PORTAL_AUTH_TOKEN_DIR";
/// OAuth token endpoint override.
pub const ENV_TOKEN_URL: &str = "PORTAL_AUTH_TOKEN_URL";
/// Per-call timeout in seconds.
pub const ENV_HTTP_TIMEOUT: &str = "PORTAL_AUTH_HTTP_TIMEOUT";
/// `strip` or `reject`.
pub const ENV_MEMBER_ID_POLICY: &str = "PORTAL_AUTH_MEMBER_ID_POLICY";
/// Staleness threshold in seconds.
pub const ENV_REFRESH_THRESHOLD: &str = "PORTAL_AUTH_REFRESH_THRESHOLD";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["portal-auth.json", "portal-auth.toml", "config.json", "config.toml"];

/// Load and validate configuration with automatic fallback strategy
///
/// # Errors
/// Returns `PortalAuthError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<AppConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("config.loaded_from_env");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "config.env_incomplete");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Client id and secret are required; everything else falls back to the
/// defaults.
///
/// # Errors
/// Returns `PortalAuthError::Config` if a required variable is missing or
/// a value does not parse.
pub fn load_from_env() -> Result<AppConfig> {
    let client_id = env_var(ENV_CLIENT_ID)?;
    let client_secret = env_var(ENV_CLIENT_SECRET)?;

    let mut config = AppConfig {
        storage: StorageConfig::default(),
        oauth: OAuthSettings::new(client_id, client_secret),
        lifecycle: LifecycleConfig::default(),
    };

    if let Some(dir) = env_opt(ENV_TOKEN_DIR) {
        config.storage.token_dir = PathBuf::from(dir);
    }
    if let Some(url) = env_opt(ENV_TOKEN_URL) {
        config.oauth.token_url = url;
    }
    if let Some(timeout) = env_parse::<u64>(ENV_HTTP_TIMEOUT)? {
        config.oauth.timeout_seconds = timeout;
    }
    if let Some(policy) = env_opt(ENV_MEMBER_ID_POLICY) {
        config.storage.member_id_policy =
            MemberIdPolicy::from_str(&policy).map_err(PortalAuthError::Config)?;
    }
    if let Some(threshold) = env_parse::<i64>(ENV_REFRESH_THRESHOLD)? {
        config.lifecycle.refresh_threshold_seconds = threshold;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is chosen by
/// extension.
///
/// # Errors
/// Returns `PortalAuthError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PortalAuthError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PortalAuthError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "config.loading_file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PortalAuthError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PortalAuthError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PortalAuthError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(PortalAuthError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.extend(cwd.ancestors().skip(1).take(2).map(Path::to_path_buf));
    }

    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.is_file())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        PortalAuthError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| PortalAuthError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
