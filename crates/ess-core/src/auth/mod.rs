//! Session and token lifecycle
//!
//! Provides:
//! - Credential exchange (login, two-factor verification)
//! - The session store, the single in-memory source of truth
//! - Sealed session persistence across restarts
//! - The silent refresh guard with coalesced token refresh

mod credentials;
mod persistence;
mod refresh;
mod session;
mod types;

pub use credentials::{
    AuthBackend, AuthenticatedLogin, CredentialExchange, HttpAuthBackend, LoginOutcome,
    post_login_destination, validate_email,
};
pub use persistence::{
    MemoryPersistence, SealedFileStore, SessionPersistence, default_secret_path,
    load_or_create_secret,
};
pub use refresh::{RefreshGuard, RefreshPolicy};
pub use session::SessionStore;
pub use types::{
    AuthPayload, BackendTokens, ChallengePayload, ExpirySemantics, LoginResponse,
    PendingVerification, RefreshResponse, Session, TokenSet, UserProfile,
};
