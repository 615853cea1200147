//! Shared fixtures for unit tests

use crate::auth::{
    HttpAuthBackend, RefreshGuard, RefreshPolicy, Session, SessionStore, TokenSet, UserProfile,
};
use crate::cache::ViewCache;
use crate::config::PortalConfig;
use crate::http::ApiClient;
use crate::navigation::WatchNavigator;
use chrono::{TimeDelta, Utc};
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

pub(crate) fn user(employment_status: &str) -> UserProfile {
    UserProfile {
        id: "7".into(),
        name: "Ada Obi".into(),
        email: "ada@example.com".into(),
        company_id: Some("3".into()),
        role: Some("employee".into()),
        employment_status: Some(employment_status.into()),
        annual_gross: Some(84_000.0),
        avatar: None,
    }
}

/// Session holding `access-1` / `refresh-1`, expiring after `expires_in`
pub(crate) fn session_expiring_in(expires_in: TimeDelta) -> Session {
    Session {
        user: user("active"),
        tokens: TokenSet {
            access_token: "access-1".into(),
            refresh_token: "refresh-1".into(),
            expires_at: Utc::now() + expires_in,
        },
        permissions: vec!["leave:create".into()],
    }
}

/// Refresh response body handing out `access_token`, valid for 15 minutes
pub(crate) fn refresh_body(access_token: &str) -> Value {
    json!({
        "accessToken": access_token,
        "refreshToken": "refresh-2",
        "expiresIn": (Utc::now() + TimeDelta::minutes(15)).timestamp_millis()
    })
}

pub(crate) struct TestStack {
    pub config: PortalConfig,
    pub store: Arc<SessionStore>,
    pub cache: Arc<ViewCache>,
    pub navigator: Arc<WatchNavigator>,
    pub guard: Arc<RefreshGuard>,
    pub client: Arc<ApiClient>,
}

/// Full client stack pointed at `server`
pub(crate) fn stack(server: &MockServer, session: Option<Session>) -> TestStack {
    let config = PortalConfig::new(server.uri());
    let http = Client::builder().no_proxy().build().expect("http client");
    let store = Arc::new(SessionStore::in_memory());
    if let Some(session) = session {
        store.set(session);
    }
    let cache = Arc::new(ViewCache::new());
    let navigator = Arc::new(WatchNavigator::default());
    let backend = HttpAuthBackend::with_http_client(http.clone(), &config).expect("auth backend");
    let guard = Arc::new(RefreshGuard::new(
        store.clone(),
        Arc::new(backend),
        cache.clone(),
        navigator.clone(),
        RefreshPolicy::from(&config),
    ));
    let client = Arc::new(
        ApiClient::with_http_client(http, &config, guard.clone()).expect("api client"),
    );
    TestStack {
        config,
        store,
        cache,
        navigator,
        guard,
        client,
    }
}
