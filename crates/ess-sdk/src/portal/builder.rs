//! Portal construction

use super::Portal;
use ess_core::attendance::AttendanceTracker;
use ess_core::auth::{
    AuthBackend, CredentialExchange, HttpAuthBackend, MemoryPersistence, RefreshGuard,
    RefreshPolicy, SealedFileStore, SessionPersistence, SessionStore,
};
use ess_core::cache::ViewCache;
use ess_core::config::{PortalConfig, timeouts};
use ess_core::error::{EssError, EssResult};
use ess_core::http::ApiClient;
use ess_core::mutation::MutationPipeline;
use ess_core::navigation::{Navigator, WatchNavigator};
use ess_core::notify::{Notifier, TracingNotifier};
use std::sync::Arc;

/// Builder for [`Portal`]; every collaborator has a default
pub struct PortalBuilder {
    config: PortalConfig,
    persistence: Option<Arc<dyn SessionPersistence>>,
    navigator: Option<Arc<dyn Navigator>>,
    notifier: Option<Arc<dyn Notifier>>,
    http_client: Option<reqwest::Client>,
    auth_backend: Option<Arc<dyn AuthBackend>>,
}

impl PortalBuilder {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            persistence: None,
            navigator: None,
            notifier: None,
            http_client: None,
            auth_backend: None,
        }
    }

    /// Where the session is persisted; defaults to the configured session
    /// file, or memory when none is configured
    pub fn with_persistence(mut self, persistence: Arc<dyn SessionPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Share a connection pool with the rest of the application
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Replace the credential and refresh endpoints
    pub fn with_auth_backend(mut self, backend: Arc<dyn AuthBackend>) -> Self {
        self.auth_backend = Some(backend);
        self
    }

    pub fn build(self) -> EssResult<Portal> {
        let config = self.config;
        config.validate()?;

        let persistence = match self.persistence {
            Some(persistence) => persistence,
            None => configured_persistence(&config)?,
        };
        let store = Arc::new(SessionStore::restore(persistence));

        let http = match self.http_client {
            Some(http) => http,
            None => reqwest::Client::builder()
                .connect_timeout(timeouts::network::connect_timeout())
                .build()
                .map_err(|e| EssError::config(format!("Failed to build HTTP client: {}", e)))?,
        };
        let backend: Arc<dyn AuthBackend> = match self.auth_backend {
            Some(backend) => backend,
            None => Arc::new(HttpAuthBackend::with_http_client(http.clone(), &config)?),
        };
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(WatchNavigator::new(config.routes.clone())));
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier));

        let cache = Arc::new(ViewCache::new());
        let guard = Arc::new(RefreshGuard::new(
            store.clone(),
            backend.clone(),
            cache.clone(),
            navigator.clone(),
            RefreshPolicy::from(&config),
        ));
        let client = Arc::new(ApiClient::with_http_client(http, &config, guard.clone())?);
        let mutations = Arc::new(MutationPipeline::new(
            client.clone(),
            cache.clone(),
            notifier.clone(),
        ));
        let credentials = CredentialExchange::new(
            backend,
            store.clone(),
            cache.clone(),
            navigator.clone(),
            config.expiry_semantics,
        );
        let attendance = AttendanceTracker::new(client.clone(), mutations.clone());

        tracing::debug!(
            base_url = %config.base_url,
            restored = store.is_authenticated(),
            "portal ready"
        );

        Ok(Portal {
            config,
            store,
            cache,
            navigator,
            notifier,
            credentials,
            guard,
            client,
            mutations,
            attendance,
        })
    }
}

fn configured_persistence(config: &PortalConfig) -> EssResult<Arc<dyn SessionPersistence>> {
    match (&config.session.file, &config.session.secret) {
        (Some(path), Some(secret)) => Ok(Arc::new(SealedFileStore::new(path, secret))),
        (Some(path), None) => Err(EssError::config_with_context(
            "session.secret is required when session.file is set",
            path.display().to_string(),
        )),
        (None, _) => Ok(Arc::new(MemoryPersistence::new())),
    }
}
