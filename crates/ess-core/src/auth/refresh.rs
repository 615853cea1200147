//! Silent refresh guard
//!
//! Every authorized request passes through [`RefreshGuard::ensure_fresh`].
//! At most one refresh is in flight at a time: it runs as a spawned task and
//! every waiter shares its result, so a waiter that gives up never cancels
//! the refresh for everyone else.
//!
//! A rejected refresh token ends the session in one place: the store (and
//! with it the persisted session) and the view cache are cleared and the
//! navigator is sent to the login page.

use super::credentials::AuthBackend;
use super::session::SessionStore;
use super::types::{ExpirySemantics, Session, TokenSet};
use crate::cache::ViewCache;
use crate::config::{PortalConfig, timeouts};
use crate::error::{EssError, EssResult, OptionExt};
use crate::navigation::{Destination, Navigator};
use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

type SharedRefresh = Shared<BoxFuture<'static, EssResult<Arc<Session>>>>;

/// Refresh timing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub expiry_semantics: ExpirySemantics,
    /// Tokens expiring within this window are refreshed before use
    pub skew: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            expiry_semantics: ExpirySemantics::default(),
            skew: timeouts::auth::refresh_skew(),
        }
    }
}

impl From<&PortalConfig> for RefreshPolicy {
    fn from(config: &PortalConfig) -> Self {
        Self {
            expiry_semantics: config.expiry_semantics,
            skew: config.refresh_skew,
        }
    }
}

struct GuardInner {
    store: Arc<SessionStore>,
    backend: Arc<dyn AuthBackend>,
    cache: Arc<ViewCache>,
    navigator: Arc<dyn Navigator>,
    policy: RefreshPolicy,
}

impl GuardInner {
    async fn run_refresh(self: Arc<Self>, current: Arc<Session>) -> EssResult<Arc<Session>> {
        tracing::debug!(user = %current.user.email, "refreshing access token");

        match self.backend.refresh(&current.tokens.refresh_token).await {
            Ok(response) => {
                let tokens = TokenSet::from_refresh(
                    response,
                    &current.tokens.refresh_token,
                    self.policy.expiry_semantics,
                    Utc::now(),
                );
                match self.store.update_tokens(&current.tokens.refresh_token, tokens) {
                    Some(session) => {
                        tracing::debug!(
                            expires_in_secs = session.tokens.remaining_lifetime(),
                            "access token refreshed"
                        );
                        Ok(session)
                    }
                    None => {
                        tracing::debug!(
                            "session ended or replaced while refreshing; discarding new tokens"
                        );
                        Err(EssError::NotAuthenticated)
                    }
                }
            }
            Err(e) if e.is_session_ending() => {
                if self.store.clear_if_current(&current.tokens.refresh_token) {
                    tracing::warn!("refresh token rejected, ending session: {}", e);
                    self.cache.clear();
                    self.navigator.navigate(Destination::Login);
                } else {
                    tracing::debug!("refresh token of a replaced session rejected: {}", e);
                }
                Err(e)
            }
            Err(e) => {
                tracing::warn!("token refresh failed, session kept: {}", e);
                Err(e)
            }
        }
    }

    fn end_session(&self) {
        self.store.clear();
        self.cache.clear();
        self.navigator.navigate(Destination::Login);
    }
}

/// A spawned refresh and its shared result
struct InFlight {
    refresh: SharedRefresh,
    /// Refresh token the refresh was started with
    refresh_token: String,
    done: Arc<AtomicBool>,
}

impl InFlight {
    fn spawn(inner: Arc<GuardInner>, current: Arc<Session>) -> Self {
        let refresh_token = current.tokens.refresh_token.clone();
        let done = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn({
            let done = done.clone();
            async move {
                let result = inner.run_refresh(current).await;
                done.store(true, Ordering::Release);
                result
            }
        });
        let refresh = async move {
            task.await.unwrap_or_else(|e| {
                Err(EssError::transient(format!("Refresh task failed: {}", e)))
            })
        }
        .boxed()
        .shared();
        Self {
            refresh,
            refresh_token,
            done,
        }
    }

    fn is_running(&self) -> bool {
        !self.done.load(Ordering::Acquire)
    }

    /// Running on behalf of the session holding `refresh_token`
    fn serves(&self, refresh_token: &str) -> bool {
        self.is_running() && self.refresh_token == refresh_token
    }
}

/// Keeps the access token valid for every request
pub struct RefreshGuard {
    inner: Arc<GuardInner>,
    in_flight: Mutex<Option<InFlight>>,
}

impl std::fmt::Debug for RefreshGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGuard")
            .field("policy", &self.inner.policy)
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl RefreshGuard {
    pub fn new(
        store: Arc<SessionStore>,
        backend: Arc<dyn AuthBackend>,
        cache: Arc<ViewCache>,
        navigator: Arc<dyn Navigator>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                store,
                backend,
                cache,
                navigator,
                policy,
            }),
            in_flight: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    /// Whether a refresh is currently running
    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .as_ref()
            .is_some_and(InFlight::is_running)
    }

    /// Current session, refreshed first if the access token is expired or
    /// about to expire
    pub async fn ensure_fresh(&self) -> EssResult<Arc<Session>> {
        let session = self.inner.store.get().or_unauthenticated()?;
        if !session
            .tokens
            .is_expired_at(Utc::now(), self.inner.policy.skew)
        {
            return Ok(session);
        }

        tracing::debug!("access token expired or expiring; refresh needed");
        self.refresh_from(&session.tokens.access_token).await
    }

    /// Refresh after the backend rejected `rejected_access_token`.
    ///
    /// If the store already holds a different, unexpired token, another
    /// request has refreshed in the meantime and that session is returned
    /// as is.
    pub async fn refresh_after_rejection(
        &self,
        rejected_access_token: &str,
    ) -> EssResult<Arc<Session>> {
        self.refresh_from(rejected_access_token).await
    }

    /// Log out: clear the session, its persisted copy and the view cache,
    /// then navigate to the login page
    pub fn logout(&self) {
        tracing::info!("logging out");
        self.inner.end_session();
    }

    async fn refresh_from(&self, stale_access_token: &str) -> EssResult<Arc<Session>> {
        let refresh = {
            let mut slot = self.in_flight.lock();
            let current = self.inner.store.get().or_unauthenticated()?;
            if current.tokens.access_token != stale_access_token
                && !current
                    .tokens
                    .is_expired_at(Utc::now(), self.inner.policy.skew)
            {
                return Ok(current);
            }

            match slot
                .as_ref()
                .filter(|in_flight| in_flight.serves(&current.tokens.refresh_token))
            {
                Some(running) => {
                    tracing::debug!("joining in-flight refresh");
                    running.refresh.clone()
                }
                None => {
                    let in_flight = InFlight::spawn(self.inner.clone(), current);
                    let refresh = in_flight.refresh.clone();
                    *slot = Some(in_flight);
                    refresh
                }
            }
        };
        refresh.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::MockAuthBackend;
    use crate::auth::persistence::{MemoryPersistence, SessionPersistence};
    use crate::auth::types::{AuthPayload, LoginResponse, RefreshResponse, UserProfile};
    use crate::cache::{CacheKey, Resource};
    use crate::navigation::WatchNavigator;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct SlowBackend {
        calls: AtomicUsize,
        delay: Duration,
        outcome: EssResult<RefreshResponse>,
    }

    impl SlowBackend {
        fn ok(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                outcome: Ok(RefreshResponse {
                    access_token: "access-2".into(),
                    refresh_token: Some("refresh-2".into()),
                    expires_in: (Utc::now() + TimeDelta::minutes(15)).timestamp_millis(),
                }),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthBackend for SlowBackend {
        async fn login(&self, _: &str, _: &str) -> EssResult<LoginResponse> {
            unreachable!()
        }

        async fn verify_code(&self, _: &str, _: &str) -> EssResult<AuthPayload> {
            unreachable!()
        }

        async fn resend_code(&self, _: &str) -> EssResult<()> {
            unreachable!()
        }

        async fn refresh(&self, refresh_token: &str) -> EssResult<RefreshResponse> {
            assert_eq!(refresh_token, "refresh-1");
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    fn session(expires_in: TimeDelta) -> Session {
        Session {
            user: UserProfile {
                id: "5".into(),
                name: "Kofi".into(),
                email: "kofi@example.com".into(),
                company_id: None,
                role: None,
                employment_status: Some("active".into()),
                annual_gross: None,
                avatar: None,
            },
            tokens: TokenSet {
                access_token: "access-1".into(),
                refresh_token: "refresh-1".into(),
                expires_at: Utc::now() + expires_in,
            },
            permissions: Vec::new(),
        }
    }

    struct Harness {
        guard: Arc<RefreshGuard>,
        store: Arc<SessionStore>,
        cache: Arc<ViewCache>,
        navigator: Arc<WatchNavigator>,
        persistence: Arc<MemoryPersistence>,
    }

    fn harness(backend: Arc<dyn AuthBackend>, session: Option<Session>) -> Harness {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = Arc::new(SessionStore::new(persistence.clone()));
        if let Some(session) = session {
            store.set(session);
        }
        let cache = Arc::new(ViewCache::new());
        let navigator = Arc::new(WatchNavigator::default());
        let guard = Arc::new(RefreshGuard::new(
            store.clone(),
            backend,
            cache.clone(),
            navigator.clone(),
            RefreshPolicy::default(),
        ));
        Harness {
            guard,
            store,
            cache,
            navigator,
            persistence,
        }
    }

    #[tokio::test]
    async fn test_valid_token_needs_no_refresh() {
        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().never();
        let h = harness(Arc::new(backend), Some(session(TimeDelta::minutes(10))));

        let session = h.guard.ensure_fresh().await.unwrap();
        assert_eq!(session.tokens.access_token, "access-1");
    }

    #[tokio::test]
    async fn test_no_session_is_not_authenticated() {
        let h = harness(Arc::new(MockAuthBackend::new()), None);
        assert_eq!(
            h.guard.ensure_fresh().await.unwrap_err(),
            EssError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let backend = Arc::new(SlowBackend::ok(Duration::from_millis(100)));
        let h = harness(backend.clone(), Some(session(TimeDelta::minutes(-1))));

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let guard = h.guard.clone();
                tokio::spawn(async move { guard.ensure_fresh().await })
            })
            .collect();

        for waiter in waiters {
            let session = waiter.await.unwrap().unwrap();
            assert_eq!(session.tokens.access_token, "access-2");
        }
        assert_eq!(backend.calls(), 1);
        assert_eq!(h.store.get().unwrap().tokens.refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn test_abandoned_wait_does_not_cancel_refresh() {
        let backend = Arc::new(SlowBackend::ok(Duration::from_millis(100)));
        let h = harness(backend.clone(), Some(session(TimeDelta::minutes(-1))));

        let gave_up =
            tokio::time::timeout(Duration::from_millis(10), h.guard.ensure_fresh()).await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(h.store.get().unwrap().tokens.access_token, "access-2");
        assert!(!h.guard.is_refreshing());

        let session = h.guard.ensure_fresh().await.unwrap();
        assert_eq!(session.tokens.access_token, "access-2");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejection_of_superseded_token_skips_refresh() {
        let backend = Arc::new(SlowBackend::ok(Duration::ZERO));
        let h = harness(backend.clone(), Some(session(TimeDelta::minutes(10))));

        let session = h.guard.refresh_after_rejection("access-0").await.unwrap();
        assert_eq!(session.tokens.access_token, "access-1");
        assert_eq!(backend.calls(), 0);

        let session = h.guard.refresh_after_rejection("access-1").await.unwrap();
        assert_eq!(session.tokens.access_token, "access-2");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_token_ends_session() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_refresh()
            .times(1)
            .returning(|_| Err(EssError::refresh_failed("Unauthorized")));
        let h = harness(Arc::new(backend), Some(session(TimeDelta::minutes(-1))));
        h.cache
            .read(CacheKey::new(Resource::Payslips), || async {
                Ok(json!(["jan"]))
            })
            .await
            .unwrap();

        let err = h.guard.ensure_fresh().await.unwrap_err();
        assert!(err.is_session_ending());
        assert!(h.store.get().is_none());
        assert!(h.persistence.is_empty());
        assert!(h.cache.peek(&CacheKey::new(Resource::Payslips)).is_none());
        assert_eq!(h.navigator.current(), Some(Destination::Login));
        assert_eq!(
            h.guard.ensure_fresh().await.unwrap_err(),
            EssError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_session() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_refresh()
            .times(1)
            .returning(|_| Err(EssError::network()));
        let h = harness(Arc::new(backend), Some(session(TimeDelta::minutes(-1))));

        let err = h.guard.ensure_fresh().await.unwrap_err();
        assert!(err.is_transient());
        assert!(h.store.get().is_some());
        assert_eq!(h.navigator.current(), None);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_keeps_session_ended() {
        let backend = Arc::new(SlowBackend::ok(Duration::from_millis(100)));
        let h = harness(backend.clone(), Some(session(TimeDelta::minutes(-1))));

        let pending = {
            let guard = h.guard.clone();
            tokio::spawn(async move { guard.ensure_fresh().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.guard.logout();

        assert_eq!(
            pending.await.unwrap().unwrap_err(),
            EssError::NotAuthenticated
        );
        assert!(h.store.get().is_none());
        assert!(h.persistence.is_empty());
        assert_eq!(h.navigator.current(), Some(Destination::Login));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_in_response_keeps_old_one() {
        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().times(1).returning(|_| {
            Ok(RefreshResponse {
                access_token: "access-2".into(),
                refresh_token: None,
                expires_in: (Utc::now() + TimeDelta::minutes(15)).timestamp_millis(),
            })
        });
        let h = harness(Arc::new(backend), Some(session(TimeDelta::minutes(-1))));

        let session = h.guard.ensure_fresh().await.unwrap();
        assert_eq!(session.tokens.access_token, "access-2");
        assert_eq!(session.tokens.refresh_token, "refresh-1");
    }

    #[tokio::test]
    async fn test_new_login_during_refresh_keeps_new_tokens() {
        let backend = Arc::new(SlowBackend::ok(Duration::from_millis(100)));
        let h = harness(backend.clone(), Some(session(TimeDelta::minutes(-1))));

        let pending = {
            let guard = h.guard.clone();
            tokio::spawn(async move { guard.ensure_fresh().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut next = session(TimeDelta::minutes(10));
        next.user.email = "ama@example.com".into();
        next.tokens.access_token = "ama-access".into();
        next.tokens.refresh_token = "ama-refresh".into();
        h.store.set(next);

        assert_eq!(
            pending.await.unwrap().unwrap_err(),
            EssError::NotAuthenticated
        );
        let current = h.store.get().unwrap();
        assert_eq!(current.user.email, "ama@example.com");
        assert_eq!(current.tokens.access_token, "ama-access");
        assert_eq!(current.tokens.refresh_token, "ama-refresh");
        assert_eq!(
            h.persistence.load().unwrap().unwrap().tokens.access_token,
            "ama-access"
        );
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_of_replaced_session_keeps_new_one() {
        let backend = Arc::new(SlowBackend {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
            outcome: Err(EssError::refresh_failed("Unauthorized")),
        });
        let h = harness(backend.clone(), Some(session(TimeDelta::minutes(-1))));

        let pending = {
            let guard = h.guard.clone();
            tokio::spawn(async move { guard.ensure_fresh().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut next = session(TimeDelta::minutes(10));
        next.tokens.refresh_token = "other-refresh".into();
        h.store.set(next);

        assert!(pending.await.unwrap().unwrap_err().is_session_ending());
        assert_eq!(
            h.store.get().unwrap().tokens.refresh_token,
            "other-refresh"
        );
        assert!(!h.persistence.is_empty());
        assert_eq!(h.navigator.current(), None);
    }
}
