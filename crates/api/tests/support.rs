//! Shared setup for dispatcher integration tests.

#![allow(dead_code)]

use portal_auth_app::AppContext;
use portal_auth_domain::{AppConfig, MemberIdPolicy, OAuthSettings, StorageConfig};
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "app.test";

/// Application wired to a temp token directory and a mock token endpoint.
pub struct TestApp {
    pub ctx: AppContext,
    pub server: MockServer,
    /// Keep temporary directory alive for the lifetime of the app.
    _dir: TempDir,
}

pub async fn setup_test_app() -> TestApp {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temporary token directory");

    let mut oauth = OAuthSettings::new(CLIENT_ID, "s3cret");
    oauth.token_url = format!("{}/oauth/token/", server.uri());
    oauth.timeout_seconds = 2;

    let config = AppConfig {
        storage: StorageConfig {
            token_dir: dir.path().join("tokens"),
            member_id_policy: MemberIdPolicy::Strip,
        },
        oauth,
        lifecycle: Default::default(),
    };

    let ctx = AppContext::from_config(config).expect("failed to build application context");
    TestApp { ctx, server, _dir: dir }
}

/// Answer one grant type with a fixed body.
pub async fn mount_token_response(server: &MockServer, grant_type: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(query_param("grant_type", grant_type))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}
