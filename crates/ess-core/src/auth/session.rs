//! Session store
//!
//! One store per running client. Readers get immutable `Arc<Session>`
//! snapshots; every write swaps the whole snapshot under the write lock, so
//! nobody observes an access token paired with another token's expiry.
//! Persistence happens inside the same lock to keep the file in step with
//! memory (a refresh finishing after logout cannot resurrect the file).

use super::persistence::{MemoryPersistence, SessionPersistence};
use super::types::{Session, TokenSet};
use parking_lot::RwLock;
use std::sync::Arc;

pub struct SessionStore {
    current: RwLock<Option<Arc<Session>>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create an empty store writing through to `persistence`
    pub fn new(persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            current: RwLock::new(None),
            persistence,
        }
    }

    /// Store that only lives in memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPersistence::new()))
    }

    /// Create a store seeded from whatever `persistence` holds
    pub fn restore(persistence: Arc<dyn SessionPersistence>) -> Self {
        let restored = match persistence.load() {
            Ok(session) => session.map(Arc::new),
            Err(e) => {
                tracing::warn!("Could not restore persisted session: {}", e);
                None
            }
        };
        if let Some(session) = &restored {
            tracing::debug!(user = %session.user.email, "restored persisted session");
        }
        Self {
            current: RwLock::new(restored),
            persistence,
        }
    }

    /// Current session snapshot
    pub fn get(&self) -> Option<Arc<Session>> {
        self.current.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replace the session (login)
    pub fn set(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let mut current = self.current.write();
        *current = Some(session.clone());
        if let Err(e) = self.persistence.save(&session) {
            tracing::warn!("Failed to persist session: {}", e);
        }
        session
    }

    /// Drop the session (logout or unrecoverable refresh failure)
    pub fn clear(&self) {
        let mut current = self.current.write();
        *current = None;
        if let Err(e) = self.persistence.clear() {
            tracing::warn!("Failed to clear persisted session: {}", e);
        }
    }

    /// Drop the session only if it still holds `refresh_token`; returns
    /// whether it was dropped
    pub(crate) fn clear_if_current(&self, refresh_token: &str) -> bool {
        let mut current = self.current.write();
        match current.as_ref() {
            Some(session) if session.tokens.refresh_token == refresh_token => {
                *current = None;
                if let Err(e) = self.persistence.clear() {
                    tracing::warn!("Failed to clear persisted session: {}", e);
                }
                true
            }
            _ => false,
        }
    }

    /// Swap in a new token triple for the session that still holds
    /// `expected_refresh_token`.
    ///
    /// Returns `None` when there is no such session: the user logged out, or
    /// logged in again, while the refresh was in flight.
    pub(crate) fn update_tokens(
        &self,
        expected_refresh_token: &str,
        tokens: TokenSet,
    ) -> Option<Arc<Session>> {
        let mut current = self.current.write();
        let existing = current.as_ref()?;
        if existing.tokens.refresh_token != expected_refresh_token {
            tracing::debug!("session replaced during refresh; dropping refreshed tokens");
            return None;
        }
        let updated = Arc::new(Session {
            user: existing.user.clone(),
            tokens,
            permissions: existing.permissions.clone(),
        });
        *current = Some(updated.clone());
        if let Err(e) = self.persistence.save(&updated) {
            tracing::warn!("Failed to persist refreshed tokens: {}", e);
        }
        Some(updated)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::UserProfile;
    use chrono::{Duration, Utc};

    fn session(access: &str) -> Session {
        Session {
            user: UserProfile {
                id: "1".into(),
                name: "Lin".into(),
                email: "lin@example.com".into(),
                company_id: None,
                role: None,
                employment_status: Some("active".into()),
                annual_gross: None,
                avatar: None,
            },
            tokens: TokenSet {
                access_token: access.into(),
                refresh_token: "refresh-1".into(),
                expires_at: Utc::now() + Duration::minutes(5),
            },
            permissions: Vec::new(),
        }
    }

    #[test]
    fn test_update_tokens_replaces_whole_triple() {
        let store = SessionStore::in_memory();
        let before = store.set(session("access-1"));

        let next = TokenSet {
            access_token: "access-2".into(),
            refresh_token: "refresh-2".into(),
            expires_at: Utc::now() + Duration::minutes(15),
        };
        let after = store.update_tokens("refresh-1", next.clone()).unwrap();

        // The old snapshot is untouched; readers holding it never see a mix.
        assert_eq!(before.tokens.access_token, "access-1");
        assert_eq!(before.tokens.refresh_token, "refresh-1");
        assert_eq!(after.tokens, next);
        assert_eq!(store.get().unwrap().tokens, next);
        assert_eq!(after.user, before.user);
    }

    #[test]
    fn test_update_after_clear_is_noop() {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = SessionStore::new(persistence.clone());
        store.set(session("access-1"));
        store.clear();

        let tokens = session("access-2").tokens;
        assert!(store.update_tokens("refresh-1", tokens).is_none());
        assert!(store.get().is_none());
        assert!(persistence.is_empty());
    }

    #[test]
    fn test_restore_from_persistence() {
        let persistence = Arc::new(MemoryPersistence::new());
        SessionStore::new(persistence.clone()).set(session("access-1"));

        let restored = SessionStore::restore(persistence);
        assert_eq!(restored.get().unwrap().tokens.access_token, "access-1");
    }

    #[test]
    fn test_update_for_replaced_session_is_dropped() {
        let store = SessionStore::in_memory();
        store.set(session("access-1"));
        let mut other = session("other-access");
        other.user.email = "bo@example.com".into();
        other.tokens.refresh_token = "other-refresh".into();
        store.set(other);

        let late = session("access-2").tokens;
        assert!(store.update_tokens("refresh-1", late).is_none());

        let current = store.get().unwrap();
        assert_eq!(current.user.email, "bo@example.com");
        assert_eq!(current.tokens.access_token, "other-access");
        assert_eq!(current.tokens.refresh_token, "other-refresh");
    }
}
