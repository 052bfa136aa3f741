//! Application context - dependency injection container

use std::sync::Arc;

use portal_auth_core::{
    LifecycleEventHandler, LifecycleOptions, OAuthClient, TokenLifecycleManager, TokenStore,
};
use portal_auth_domain::{AppConfig, Result};
use portal_auth_infra::{config, FileTokenStore, HttpOAuthClient};

/// Application context - holds all services and dependencies
pub struct AppContext {
    /// Loaded and validated configuration.
    pub config: AppConfig,
    /// File-backed record store, shared with the manager.
    pub store: Arc<FileTokenStore>,
    /// Token lifecycle manager.
    pub manager: Arc<TokenLifecycleManager>,
    /// Install/uninstall event handler.
    pub events: LifecycleEventHandler,
}

impl AppContext {
    /// Create a context from the environment or the first config file found.
    ///
    /// # Errors
    /// Returns `Config` if no usable configuration exists, or the store's
    /// error if the token directory cannot be prepared.
    pub fn new() -> Result<Self> {
        Self::from_config(config::load()?)
    }

    /// Create a context talking to the configured platform endpoint.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let oauth = Arc::new(HttpOAuthClient::new(&config.oauth)?);
        Self::with_oauth_client(config, oauth)
    }

    /// Create a context with a caller-supplied OAuth capability.
    ///
    /// Used to run against a scripted or alternative token endpoint.
    pub fn with_oauth_client(config: AppConfig, oauth: Arc<dyn OAuthClient>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(FileTokenStore::open(&config.storage)?);
        let options = LifecycleOptions::from_config(&config);
        let manager = Arc::new(TokenLifecycleManager::new(
            Arc::clone(&store) as Arc<dyn TokenStore>,
            oauth,
            options,
        ));
        let events = LifecycleEventHandler::new(Arc::clone(&manager));

        tracing::info!(
            token_dir = %store.dir().display(),
            member_id_policy = %config.storage.member_id_policy,
            refresh_threshold_seconds = config.lifecycle.refresh_threshold_seconds,
            "app_context.ready"
        );

        Ok(Self { config, store, manager, events })
    }
}
