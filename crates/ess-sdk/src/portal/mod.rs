//! The portal context object

mod builder;
mod views;


pub use builder::PortalBuilder;

use ess_core::attendance::AttendanceTracker;
use ess_core::auth::{
    AuthenticatedLogin, CredentialExchange, LoginOutcome, PendingVerification, RefreshGuard,
    Session, SessionStore,
};
use ess_core::cache::ViewCache;
use ess_core::config::PortalConfig;
use ess_core::error::EssResult;
use ess_core::http::ApiClient;
use ess_core::mutation::MutationPipeline;
use ess_core::navigation::{Destination, Navigator};
use ess_core::notify::Notifier;
use std::sync::Arc;

/// One portal session and everything that acts on it
pub struct Portal {
    config: PortalConfig,
    store: Arc<SessionStore>,
    cache: Arc<ViewCache>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    credentials: CredentialExchange,
    guard: Arc<RefreshGuard>,
    client: Arc<ApiClient>,
    mutations: Arc<MutationPipeline>,
    attendance: AttendanceTracker,
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("base_url", &self.config.base_url)
            .field("authenticated", &self.store.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Portal {
    /// Portal with default collaborators
    pub fn new(config: PortalConfig) -> EssResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: PortalConfig) -> PortalBuilder {
        PortalBuilder::new(config)
    }

    /// Password login
    pub async fn login(&self, email: &str, password: &str) -> EssResult<LoginOutcome> {
        let outcome = self.credentials.login(email, password).await?;
        if matches!(outcome, LoginOutcome::Authenticated(_)) {
            self.attendance.reset();
        }
        Ok(outcome)
    }

    /// Finish a two-factor login
    pub async fn verify_code(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> EssResult<AuthenticatedLogin> {
        let login = self.credentials.verify_code(pending, code).await?;
        self.attendance.reset();
        Ok(login)
    }

    pub async fn resend_code(&self, pending: &PendingVerification) -> EssResult<()> {
        self.credentials.resend_code(pending).await
    }

    /// End the session locally and go to the login page
    pub fn logout(&self) {
        self.guard.logout();
        self.attendance.reset();
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.store.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Current session with a usable access token
    pub async fn ensure_fresh(&self) -> EssResult<Arc<Session>> {
        self.guard.ensure_fresh().await
    }

    /// Where the session layer last sent the user
    pub fn destination(&self) -> Option<Destination> {
        self.navigator.current()
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn mutations(&self) -> &Arc<MutationPipeline> {
        &self.mutations
    }

    pub fn cache(&self) -> &Arc<ViewCache> {
        &self.cache
    }

    pub fn attendance(&self) -> &AttendanceTracker {
        &self.attendance
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }
}
