use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portal_auth_core::OAuthClient;
use portal_auth_domain::{PortalAuthError, Result, TokenGrant};

/// Scripted `OAuthClient` that counts calls.
///
/// Responses are consumed in order; once the script runs out the last
/// response is repeated. An optional delay simulates a slow endpoint.
#[derive(Default, Clone)]
pub struct MockOAuthClient {
    exchange_script: Arc<Mutex<VecDeque<Result<TokenGrant>>>>,
    refresh_script: Arc<Mutex<VecDeque<Result<TokenGrant>>>>,
    exchange_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    seen_refresh_tokens: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockOAuthClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchange_returns(self, response: Result<TokenGrant>) -> Self {
        self.exchange_script.lock().unwrap().push_back(response);
        self
    }

    pub fn refresh_returns(self, response: Result<TokenGrant>) -> Self {
        self.refresh_script.lock().unwrap().push_back(response);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.seen_refresh_tokens.lock().unwrap().clone()
    }

    fn next(script: &Mutex<VecDeque<Result<TokenGrant>>>, unscripted: PortalAuthError) -> Result<TokenGrant> {
        let mut script = script.lock().unwrap();
        match script.len() {
            0 => Err(unscripted),
            1 => script.front().cloned().unwrap(),
            _ => script.pop_front().unwrap(),
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl OAuthClient for MockOAuthClient {
    async fn exchange_code(&self, _code: &str) -> Result<TokenGrant> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Self::next(&self.exchange_script, PortalAuthError::ExchangeFailed("unscripted".into()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_refresh_tokens.lock().unwrap().push(refresh_token.to_string());
        self.pause().await;
        Self::next(&self.refresh_script, PortalAuthError::RefreshFailed("unscripted".into()))
    }
}
